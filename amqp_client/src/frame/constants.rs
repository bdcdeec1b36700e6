use super::types::{AmqpChannelId, AmqpReplyCode, LongUint, Octect};

pub const FRAME_METHOD: Octect = 1;
pub const FRAME_CONTENT_HEADER: Octect = 2;
pub const FRAME_CONTENT_BODY: Octect = 3;
pub const FRAME_HEARTBEAT: Octect = 8;

pub const FRAME_END: Octect = 206;

/// frame type (1) + channel id (2) + payload size (4)
pub const FRAME_HEADER_SIZE: usize = 7;
/// Smallest `frame_max` a peer is allowed to negotiate.
pub const FRAME_MIN_SIZE: LongUint = 4096;

/// Channel 0 is reserved for the connection itself.
pub const DEFAULT_CONN_CHANNEL: AmqpChannelId = 0;

pub const REPLY_SUCCESS: AmqpReplyCode = 200;

// hard error / connection
pub const CONNECTION_FORCED: AmqpReplyCode = 320;
pub const ACCESS_REFUSED: AmqpReplyCode = 403;
pub const FRAME_ERROR: AmqpReplyCode = 501;
pub const CHANNEL_ERROR: AmqpReplyCode = 504;
pub const UNEXPECTED_FRAME: AmqpReplyCode = 505;
pub const NOT_ALLOWED: AmqpReplyCode = 530;
