//! # Call Encoding
//!
//! Builds the request for each bridged function and pulls its result out of the
//! response. Kept free of I/O so `Bridge` only sequences them around an exchange.

use duopack::Message;
use duopack::MsgId;
use duopack::StaticPayload;
use duopack::VarData;

use crate::error::Error;
use crate::error::Result;

pub fn invert_request(input: bool) -> Message {
    Message::new(StaticPayload::InvertRequest { input })
}

pub fn invert_result(response: &Message) -> Result<bool> {
    match response.payload {
        StaticPayload::InvertResponse { output } => Ok(output),
        _ => Err(Error::UnexpectedPayload(MsgId::Invert)),
    }
}

/// Both strings go into the variable data, `s1` first.
pub fn concat_request(s1: &[u8], s2: &[u8]) -> Result<Message> {
    let mut var = VarData::new();
    let s1 = var.push(s1)?;
    let s2 = var.push(s2)?;
    Ok(Message::with_var(StaticPayload::ConcatRequest { s1, s2 }, var))
}

pub fn concat_result(response: &Message) -> Result<&[u8]> {
    match response.payload {
        StaticPayload::ConcatResponse { out } => Ok(response.var.get(out)?),
        _ => Err(Error::UnexpectedPayload(MsgId::Concat)),
    }
}

/// Copies the concatenation into `out` and returns the number of bytes written.
pub fn concat_result_into(response: &Message, out: &mut [u8]) -> Result<usize> {
    let bytes = concat_result(response)?;
    if bytes.len() > out.len() {
        return Err(Error::OutputTooSmall { needed: bytes.len(), capacity: out.len() });
    }
    out[..bytes.len()].copy_from_slice(bytes);
    Ok(bytes.len())
}

pub fn set_callback_request() -> Message {
    Message::new(StaticPayload::SetCallbackRequest)
}

pub fn set_callback_result(response: &Message) -> Result<()> {
    match response.payload {
        StaticPayload::SetCallbackResponse => Ok(()),
        _ => Err(Error::UnexpectedPayload(MsgId::SetCallback)),
    }
}
