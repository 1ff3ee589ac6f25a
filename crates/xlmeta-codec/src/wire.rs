//! MessagePack primitives: a borrowing cursor for reads and thin write helpers.
//!
//! Errors here carry no field path; the decoder and encoder attach one.

use rmp::decode::{NumValueReadError, ValueReadError};
use rmp::encode::ValueWriteError;
use rmp::Marker;

/// Primitive failure, before a field path is attached.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum WireError {
    Truncated,
    TypeMismatch { expected: &'static str, found: Marker },
    OutOfRange,
    InvalidUtf8,
    Reserved,
    TooDeep,
    TooLong,
    Write(String),
}

fn from_value_read(expected: &'static str) -> impl Fn(ValueReadError) -> WireError {
    move |err| match err {
        ValueReadError::TypeMismatch(found) => WireError::TypeMismatch { expected, found },
        ValueReadError::InvalidMarkerRead(_) | ValueReadError::InvalidDataRead(_) => {
            WireError::Truncated
        }
    }
}

fn from_num_read(expected: &'static str) -> impl Fn(NumValueReadError) -> WireError {
    move |err| match err {
        NumValueReadError::TypeMismatch(found) => WireError::TypeMismatch { expected, found },
        NumValueReadError::OutOfRange => WireError::OutOfRange,
        NumValueReadError::InvalidMarkerRead(_) | NumValueReadError::InvalidDataRead(_) => {
            WireError::Truncated
        }
    }
}

/// Cursor over an immutable MessagePack buffer.
#[derive(Clone, Debug)]
pub(crate) struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Resume reading at a byte offset previously returned by [`position`](Self::position).
    pub fn at(buf: &'a [u8], pos: usize) -> Self {
        Self {
            buf,
            pos: pos.min(buf.len()),
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], WireError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.buf.len())
            .ok_or(WireError::Truncated)?;
        let out = &self.buf[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn take_u8(&mut self) -> Result<u8, WireError> {
        Ok(self.take(1)?[0])
    }

    fn take_u16(&mut self) -> Result<u16, WireError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn take_u32(&mut self) -> Result<u32, WireError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Run an `rmp` read against the unread tail and advance past what it consumed.
    fn with_rmp<T, E>(&mut self, f: impl FnOnce(&mut &'a [u8]) -> Result<T, E>) -> Result<T, E> {
        let mut rd = &self.buf[self.pos..];
        let out = f(&mut rd);
        self.pos = self.buf.len() - rd.len();
        out
    }

    pub fn peek_marker(&self) -> Result<Marker, WireError> {
        self.buf
            .get(self.pos)
            .map(|&b| Marker::from_u8(b))
            .ok_or(WireError::Truncated)
    }

    fn read_marker(&mut self) -> Result<Marker, WireError> {
        let marker = self.peek_marker()?;
        self.pos += 1;
        Ok(marker)
    }

    /// Consume a `nil` if one is next. Returns whether it did.
    pub fn try_read_nil(&mut self) -> Result<bool, WireError> {
        if self.peek_marker()? == Marker::Null {
            self.pos += 1;
            return Ok(true);
        }
        Ok(false)
    }

    pub fn read_map_len(&mut self) -> Result<usize, WireError> {
        self.with_rmp(|rd| rmp::decode::read_map_len(rd))
            .map(|n| n as usize)
            .map_err(from_value_read("map"))
    }

    pub fn read_array_len(&mut self) -> Result<usize, WireError> {
        self.with_rmp(|rd| rmp::decode::read_array_len(rd))
            .map(|n| n as usize)
            .map_err(from_value_read("array"))
    }

    pub fn read_str(&mut self) -> Result<&'a str, WireError> {
        let len = self
            .with_rmp(|rd| rmp::decode::read_str_len(rd))
            .map_err(from_value_read("string"))?;
        let bytes = self.take(len as usize)?;
        std::str::from_utf8(bytes).map_err(|_| WireError::InvalidUtf8)
    }

    pub fn read_bin(&mut self) -> Result<&'a [u8], WireError> {
        let len = self
            .with_rmp(|rd| rmp::decode::read_bin_len(rd))
            .map_err(from_value_read("binary"))?;
        self.take(len as usize)
    }

    pub fn read_i64(&mut self) -> Result<i64, WireError> {
        self.with_rmp(|rd| rmp::decode::read_int::<i64, _>(rd))
            .map_err(from_num_read("integer"))
    }

    pub fn read_u64(&mut self) -> Result<u64, WireError> {
        self.with_rmp(|rd| rmp::decode::read_int::<u64, _>(rd))
            .map_err(from_num_read("unsigned integer"))
    }

    /// Consume one complete value of any type without interpreting it.
    ///
    /// Containers are walked iteratively; `max_depth` bounds how many may be
    /// open at once.
    pub fn skip_value(&mut self, max_depth: usize) -> Result<(), WireError> {
        // Values still to consume at each open nesting level.
        let mut pending: Vec<u64> = vec![1];
        while let Some(top) = pending.last_mut() {
            if *top == 0 {
                pending.pop();
                continue;
            }
            *top -= 1;

            let children: u64 = match self.read_marker()? {
                Marker::FixPos(_) | Marker::FixNeg(_) | Marker::Null | Marker::True | Marker::False => 0,
                Marker::U8 | Marker::I8 => {
                    self.take(1)?;
                    0
                }
                Marker::U16 | Marker::I16 => {
                    self.take(2)?;
                    0
                }
                Marker::U32 | Marker::I32 | Marker::F32 => {
                    self.take(4)?;
                    0
                }
                Marker::U64 | Marker::I64 | Marker::F64 => {
                    self.take(8)?;
                    0
                }
                Marker::FixStr(n) => {
                    self.take(n as usize)?;
                    0
                }
                Marker::Str8 | Marker::Bin8 => {
                    let n = self.take_u8()?;
                    self.take(n as usize)?;
                    0
                }
                Marker::Str16 | Marker::Bin16 => {
                    let n = self.take_u16()?;
                    self.take(n as usize)?;
                    0
                }
                Marker::Str32 | Marker::Bin32 => {
                    let n = self.take_u32()?;
                    self.take(n as usize)?;
                    0
                }
                // Extension payloads are a type byte followed by the data.
                Marker::FixExt1 => {
                    self.take(2)?;
                    0
                }
                Marker::FixExt2 => {
                    self.take(3)?;
                    0
                }
                Marker::FixExt4 => {
                    self.take(5)?;
                    0
                }
                Marker::FixExt8 => {
                    self.take(9)?;
                    0
                }
                Marker::FixExt16 => {
                    self.take(17)?;
                    0
                }
                Marker::Ext8 => {
                    let n = self.take_u8()?;
                    self.take(n as usize + 1)?;
                    0
                }
                Marker::Ext16 => {
                    let n = self.take_u16()?;
                    self.take(n as usize + 1)?;
                    0
                }
                Marker::Ext32 => {
                    let n = self.take_u32()?;
                    self.take(n as usize + 1)?;
                    0
                }
                Marker::FixArray(n) => n as u64,
                Marker::Array16 => self.take_u16()? as u64,
                Marker::Array32 => self.take_u32()? as u64,
                Marker::FixMap(n) => 2 * n as u64,
                Marker::Map16 => 2 * self.take_u16()? as u64,
                Marker::Map32 => 2 * self.take_u32()? as u64,
                Marker::Reserved => return Err(WireError::Reserved),
            };

            if children > 0 {
                if pending.len() > max_depth {
                    return Err(WireError::TooDeep);
                }
                // Every child needs at least one byte.
                if children > self.remaining() as u64 {
                    return Err(WireError::Truncated);
                }
                pending.push(children);
            }
        }
        Ok(())
    }
}

fn from_write(err: ValueWriteError) -> WireError {
    WireError::Write(err.to_string())
}

fn len_u32(len: usize) -> Result<u32, WireError> {
    u32::try_from(len).map_err(|_| WireError::TooLong)
}

pub(crate) fn write_map_len(buf: &mut Vec<u8>, len: usize) -> Result<(), WireError> {
    rmp::encode::write_map_len(buf, len_u32(len)?).map_err(from_write)?;
    Ok(())
}

pub(crate) fn write_array_len(buf: &mut Vec<u8>, len: usize) -> Result<(), WireError> {
    rmp::encode::write_array_len(buf, len_u32(len)?).map_err(from_write)?;
    Ok(())
}

pub(crate) fn write_str(buf: &mut Vec<u8>, s: &str) -> Result<(), WireError> {
    len_u32(s.len())?;
    rmp::encode::write_str(buf, s).map_err(from_write)
}

pub(crate) fn write_bin(buf: &mut Vec<u8>, data: &[u8]) -> Result<(), WireError> {
    len_u32(data.len())?;
    rmp::encode::write_bin(buf, data).map_err(from_write)
}

pub(crate) fn write_sint(buf: &mut Vec<u8>, value: i64) -> Result<(), WireError> {
    rmp::encode::write_sint(buf, value).map_err(from_write)?;
    Ok(())
}

pub(crate) fn write_uint(buf: &mut Vec<u8>, value: u64) -> Result<(), WireError> {
    rmp::encode::write_uint(buf, value).map_err(from_write)?;
    Ok(())
}
