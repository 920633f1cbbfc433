/// Subprotocol a controller announces when it dials the relay.
pub const DEFAULT_CONTROLLER_PROTOCOL: &str = "sender";

/// Query parameter a reconnecting peer uses to reclaim its identity.
pub const CLIENT_ID_PARAM: &str = "clientId";
