//! XDR (RFC 4506) primitives used by the NFSv4 client

use super::NfsError;

/// Append-only XDR encoder
#[derive(Debug, Default)]
pub(crate) struct XdrWriter {
    buf: Vec<u8>,
}

impl XdrWriter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn put_u32(&mut self, value: u32) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub(crate) fn put_u64(&mut self, value: u64) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub(crate) fn put_bool(&mut self, value: bool) -> &mut Self {
        self.put_u32(u32::from(value))
    }

    /// Fixed-length opaque: bytes plus padding, no length prefix
    pub(crate) fn put_fixed(&mut self, data: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(data);
        self.pad(data.len());
        self
    }

    /// Variable-length opaque: length prefix, bytes, padding
    pub(crate) fn put_opaque(&mut self, data: &[u8]) -> Result<&mut Self, NfsError> {
        let len = u32::try_from(data.len())
            .map_err(|_| NfsError::Encode(format!("opaque of {} bytes", data.len())))?;
        self.put_u32(len);
        Ok(self.put_fixed(data))
    }

    pub(crate) fn put_string(&mut self, value: &str) -> Result<&mut Self, NfsError> {
        self.put_opaque(value.as_bytes())
    }

    pub(crate) fn len(&self) -> usize {
        self.buf.len()
    }

    pub(crate) fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    fn pad(&mut self, len: usize) {
        let padding = (4 - len % 4) % 4;
        self.buf.extend(std::iter::repeat(0u8).take(padding));
    }
}

/// Cursor over an XDR encoded buffer
#[derive(Debug)]
pub(crate) struct XdrReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> XdrReader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(crate) fn get_u32(&mut self) -> Result<u32, NfsError> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub(crate) fn get_u64(&mut self) -> Result<u64, NfsError> {
        let hi = u64::from(self.get_u32()?);
        let lo = u64::from(self.get_u32()?);
        Ok(hi << 32 | lo)
    }

    pub(crate) fn get_i64(&mut self) -> Result<i64, NfsError> {
        Ok(self.get_u64()? as i64)
    }

    pub(crate) fn get_bool(&mut self) -> Result<bool, NfsError> {
        match self.get_u32()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(NfsError::Decode(format!("invalid bool discriminant {other}"))),
        }
    }

    /// Fixed-length opaque of `len` bytes, padding consumed
    pub(crate) fn get_fixed(&mut self, len: usize) -> Result<&'a [u8], NfsError> {
        let data = self.take(len)?;
        self.take((4 - len % 4) % 4)?;
        Ok(data)
    }

    pub(crate) fn get_opaque(&mut self) -> Result<&'a [u8], NfsError> {
        let len = self.get_u32()? as usize;
        self.get_fixed(len)
    }

    pub(crate) fn get_string(&mut self) -> Result<String, NfsError> {
        Ok(String::from_utf8_lossy(self.get_opaque()?).into_owned())
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], NfsError> {
        if self.remaining() < len {
            return Err(NfsError::Truncated {
                wanted: len,
                available: self.remaining(),
            });
        }
        let data = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(data)
    }
}
