pub fn _assert_send<T: Send>() {}
pub fn _assert_sync<T: Sync>() {}
