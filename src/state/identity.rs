use axum::http::HeaderMap;

/// Header carrying the caller's user id.
pub const PLAYER_ID_HEADER: &str = "x-player-id";

/// Who is calling, as far as persistence is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PlayerIdentity {
    /// An authenticated account whose scores and profile are stored.
    Registered(String),
    /// A local guest id; gameplay works but nothing is stored.
    Guest(String),
    /// No id was supplied.
    Anonymous,
}

impl PlayerIdentity {
    /// Classify a raw user id. Blank ids count as anonymous.
    pub fn from_user_id(user_id: Option<&str>, guest_prefix: &str) -> Self {
        match user_id.map(str::trim).filter(|id| !id.is_empty()) {
            None => PlayerIdentity::Anonymous,
            Some(id) if !guest_prefix.is_empty() && id.starts_with(guest_prefix) => {
                PlayerIdentity::Guest(id.to_owned())
            }
            Some(id) => PlayerIdentity::Registered(id.to_owned()),
        }
    }

    /// Read the identity from request headers.
    ///
    /// The header value is taken as-is: this service does not authenticate
    /// callers. It must sit behind a gateway that verifies the session and
    /// sets `x-player-id` itself, stripping any client-supplied value.
    /// Values that are not visible ASCII read as anonymous.
    pub fn from_headers(headers: &HeaderMap, guest_prefix: &str) -> Self {
        let user_id = headers
            .get(PLAYER_ID_HEADER)
            .and_then(|value| value.to_str().ok());
        Self::from_user_id(user_id, guest_prefix)
    }

    /// The user id under which scores and profiles are stored, if any.
    pub fn persistence_key(&self) -> Option<&str> {
        match self {
            PlayerIdentity::Registered(id) => Some(id),
            PlayerIdentity::Guest(_) | PlayerIdentity::Anonymous => None,
        }
    }

    /// Whether this caller may act on a session opened by `owner`.
    ///
    /// Sessions opened anonymously accept any caller.
    pub fn may_act_on(&self, owner: &PlayerIdentity) -> bool {
        matches!(owner, PlayerIdentity::Anonymous) || owner == self
    }
}
