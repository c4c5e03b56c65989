use super::*;

#[test]
fn every_state_and_target_has_exactly_one_transition() {
    for auth in [AuthState::Unauthenticated, AuthState::Authenticated] {
        for target in [
            RouteTarget::OnLogin,
            RouteTarget::OnProtected,
            RouteTarget::OnOther,
        ] {
            let hits = TRANSITIONS
                .iter()
                .filter(|(state, on, _)| *state == auth && *on == target)
                .count();
            assert_eq!(hits, 1, "{auth:?} x {target:?}");
        }
    }
}

#[test]
fn protected_path_redirects_to_login_when_unauthenticated() {
    for path in ["/", "", "/?tab=results", "//"] {
        assert_eq!(
            navigate(AuthState::Unauthenticated, classify(path)),
            Navigation::Redirect(Route::Login),
            "path {path:?}"
        );
    }
}

#[test]
fn login_redirects_to_workflow_when_authenticated() {
    for path in ["/login", "/login/", "/login?next=/"] {
        assert_eq!(
            navigate(AuthState::Authenticated, classify(path)),
            Navigation::Redirect(Route::Workflow),
            "path {path:?}"
        );
    }
}

#[test]
fn unknown_paths_redirect_to_default() {
    for auth in [AuthState::Unauthenticated, AuthState::Authenticated] {
        assert_eq!(
            navigate(auth, classify("/settings/profile")),
            Navigation::Redirect(Route::Workflow)
        );
    }
}

#[test]
fn resolve_follows_redirect_chain() {
    assert_eq!(resolve(AuthState::Unauthenticated, "/nowhere"), Route::Login);
    assert_eq!(resolve(AuthState::Authenticated, "/nowhere"), Route::Workflow);
    assert_eq!(resolve(AuthState::Authenticated, "/login"), Route::Workflow);
    assert_eq!(resolve(AuthState::Unauthenticated, "/login"), Route::Login);
}

#[test]
fn route_paths_classify_back_to_themselves() {
    assert_eq!(classify(Route::Login.path()), RouteTarget::OnLogin);
    assert_eq!(classify(Route::Workflow.path()), RouteTarget::OnProtected);
}
