use super::resolver::ProfileStatus;

/// Routes reachable without a session.
const OPEN_ROUTES: &[&str] = &["/login", "/signup", "/signup/level2"];

/// Where to send the client instead of rendering `path`, if anywhere.
/// Evaluated by every guarded handler, so the decision is re-made on each
/// navigation.
pub fn redirect_for(status: &ProfileStatus, path: &str) -> Option<String> {
    match status {
        ProfileStatus::Unauthenticated => {
            (!OPEN_ROUTES.contains(&path)).then(|| "/login".to_string())
        }
        ProfileStatus::NoProfile | ProfileStatus::Incomplete => {
            (path != "/signup/level2").then(|| "/signup/level2".to_string())
        }
        ProfileStatus::Complete { username } => {
            let canonical = format!("/{username}");
            let within = path == canonical
                || path.starts_with(&format!("{canonical}/"))
                || path.starts_with("/space/");
            (!within).then_some(canonical)
        }
    }
}
