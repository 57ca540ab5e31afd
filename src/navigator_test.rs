use super::*;

#[test]
fn starts_on_initial_path_without_history() {
    let nav = MemoryNavigator::new("/waiter/dashboard/");
    assert_eq!(nav.current_path(), "/waiter/dashboard/");
    assert!(nav.history().is_empty());
    assert_eq!(nav.last_redirect(), None);
}

#[test]
fn navigate_updates_current_and_records_history() {
    let nav = MemoryNavigator::new("/");
    nav.navigate("/login/");
    nav.navigate("/chef/dashboard/");
    assert_eq!(nav.current_path(), "/chef/dashboard/");
    assert_eq!(nav.history(), vec!["/login/".to_owned(), "/chef/dashboard/".to_owned()]);
    assert_eq!(nav.last_redirect().as_deref(), Some("/chef/dashboard/"));
}
