use std::fmt;

use uuid::Uuid;

use crate::reference::LOCAL_HANDLE_PREFIX;

const HANDLE_AUTHORITY: &str = "panelkit/";

/// Identity of one live renderable handle.
///
/// Its URL form (`blob:panelkit/<uuid>`) is what display surfaces consume and
/// what [`MediaReference`](crate::MediaReference) recognises as local.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleId(Uuid);

impl HandleId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn to_url(&self) -> String {
        let mut url = String::with_capacity(
            LOCAL_HANDLE_PREFIX.len() + HANDLE_AUTHORITY.len() + 36,
        );
        url.push_str(LOCAL_HANDLE_PREFIX);
        url.push_str(HANDLE_AUTHORITY);
        url.push_str(&self.0.hyphenated().to_string());
        url
    }
}

impl Default for HandleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HandleId").field(&self.0).finish()
    }
}
