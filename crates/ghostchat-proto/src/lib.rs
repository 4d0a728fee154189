//! Ghostchat wire protocol.
//!
//! Every frame on the wire is a single JSON object whose `type` field names
//! the frame kind. Inbound frames (client → server) decode into
//! [`ClientFrame`], outbound frames (server → client) into [`ServerFrame`].
//! Both are closed tagged enums, so adding a frame kind forces every match
//! over them to be revisited.
//!
//! # Frame kinds
//!
//! ```text
//! client → server                server → client
//! ───────────────                ───────────────
//! pair_request  {to}             hello          {code}
//! pair_accept   {from}           pair_request   {from}
//! pair_decline  {to}             pair_accept    {from}
//! direct_msg    {to, text}       pair_decline   {from}
//! voice_msg     {to, audio}      direct_msg     {from, to, text, ts}
//! group_create  {name, members}  voice_msg      {from, to, audio, ts}
//! group_accept  {groupId}        group_invite   {group}
//! group_msg     {groupId, text}  group_created  {group}
//! group_close   {groupId}        group_join     {groupId, code, members, pending}
//! group_leave   {groupId}        group_msg      {groupId, from, text, ts}
//!                                group_closed   {groupId}
//!                                group_leave    {groupId, code}
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod code;
mod errors;
pub mod frame;
mod group;

pub use code::{Code, GroupId};
pub use errors::FrameError;
pub use frame::{ClientFrame, ServerFrame};
pub use group::GroupSnapshot;
