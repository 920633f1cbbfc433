/*!
Wire protocol shared by the [peer-relay](../peer_relay/index.html) library and the
[signaling server](../peer_relay_signaling_server/index.html).

A signaling channel carries JSON objects of the shape

```text
{ "type": "clientconnect" | "clientclose" | "offer" | "answer" | "candidate" | "log",
  "sdp": string?, "candidate": string?, "sdpMid": string?,
  "sdpMLineIndex": int?, "clientId": string?, "logMsg": string? }
```

plus arbitrary text and binary frames that are relayed without interpretation.
*/

pub mod codec;
mod common;
mod error;
pub mod message;

pub use codec::{decode, encode, Frame};
pub use common::{PeerId, SdpKind};
pub use error::{DecodeError, MessageError};
pub use message::{Description, IceCandidate, SignalingMessage};
