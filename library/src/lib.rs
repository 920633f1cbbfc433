/*!
A signaling relay for a star of `WebRTC` sessions: one controller, any number of peers.

# Overview

Before two endpoints can talk over `WebRTC` they have to trade session descriptions
and ICE candidates through some other channel. This crate is that channel.
Every peer that connects is announced to the controller, which starts a session with it
by sending an offer. Answers and candidates flow back the same way, stamped with the
identity of the peer that sent them, so the controller always knows whose session a
message belongs to. Peers never see each other.

The [`Relay`] owns the registry of live connections, decides where each message goes
and tracks where every session stands in the offer/answer exchange
(see [`negotiation`]). It is transport agnostic: adapters hand it streams and sinks of
[`Frame`]s. The accompanying signaling-server crate does that for WebSocket.

The [`controller`] module is the other end: it either dials a relay over WebSocket or
attaches to one in the same process, and turns relayed messages into calls on a
[`controller::MediaHandler`].

*/

#![allow(
    clippy::module_name_repetitions,
)]
// clippy WARN level lints
#![warn(
    // missing_docs,
    clippy::cargo,
    clippy::pedantic,
    // clippy::nursery,
    clippy::dbg_macro,
    clippy::unwrap_used,
    clippy::integer_division,
    clippy::large_include_file,
    clippy::map_err_ignore,
    // clippy::missing_docs_in_private_items,
    clippy::panic,
    clippy::todo,
    clippy::undocumented_unsafe_blocks,
    clippy::unimplemented,
    clippy::unreachable
)]
// clippy WARN level lints, that can be upgraded to DENY if preferred
#![warn(
    clippy::float_arithmetic,
    clippy::integer_arithmetic,
    clippy::modulo_arithmetic,
    clippy::as_conversions,
    clippy::assertions_on_result_states,
    clippy::clone_on_ref_ptr,
    clippy::create_dir,
    clippy::default_union_representation,
    clippy::deref_by_slicing,
    clippy::empty_drop,
    clippy::empty_structs_with_brackets,
    clippy::exit,
    clippy::filetype_is_file,
    clippy::float_cmp_const,
    clippy::if_then_some_else_none,
    clippy::indexing_slicing,
    clippy::let_underscore_must_use,
    clippy::lossy_float_literal,
    clippy::pattern_type_mismatch,
    clippy::string_slice,
    clippy::try_err
)]
// clippy DENY level lints, they always have a quick fix that should be preferred
#![deny(
    clippy::wildcard_imports,
    clippy::multiple_inherent_impl,
    clippy::rc_buffer,
    clippy::rc_mutex,
    clippy::rest_pat_in_fully_bound_structs,
    clippy::same_name_method,
    clippy::self_named_module_files,
    clippy::separated_literal_suffix,
    clippy::shadow_unrelated,
    clippy::str_to_string,
    clippy::string_add,
    clippy::string_to_string,
    clippy::unnecessary_self_imports,
    clippy::unneeded_field_pattern,
    clippy::unseparated_literal_suffix,
    clippy::verbose_file_reads
)]

pub(crate) mod constants;
pub mod controller;
mod error;
pub mod negotiation;
pub mod registry;
mod relay;
pub mod router;
pub mod transport;

pub use constants::{CLIENT_ID_PARAM, DEFAULT_CONTROLLER_PROTOCOL};
pub use error::{Error, RelayError, Result, RoutingError, TransportError};
pub use peer_relay_protocol::{
    Description, Frame, IceCandidate, MessageError, PeerId, SdpKind, SignalingMessage,
};
pub use relay::{ErrorReports, Relay, RelayConfig};
