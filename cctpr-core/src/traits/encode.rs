use std::io::{Error, ErrorKind};

use crate::{CctprError, Signature, H160, H256, U256};

/// Simple trait for types with a canonical big-endian encoding
pub trait Encode {
    /// Write the canonical encoding to the writer
    fn write_to<W>(&self, writer: &mut W) -> std::io::Result<usize>
    where
        W: std::io::Write;

    /// Serialize to a vec
    fn to_vec(&self) -> Vec<u8> {
        let mut buf = vec![];
        self.write_to(&mut buf).expect("!alloc");
        buf
    }
}

/// Simple trait for types with a canonical big-endian encoding
pub trait Decode {
    /// Try to read from some source
    fn read_from<R>(reader: &mut R) -> Result<Self, CctprError>
    where
        R: std::io::Read,
        Self: Sized;

    /// Decode from a byte slice, rejecting trailing bytes.
    fn from_slice(mut bytes: &[u8]) -> Result<Self, CctprError>
    where
        Self: Sized,
    {
        let value = Self::read_from(&mut bytes)?;
        if !bytes.is_empty() {
            return Err(CctprError::decode(format!(
                "{} trailing bytes",
                bytes.len()
            )));
        }
        Ok(value)
    }
}

macro_rules! impl_uint_codec {
    ($($ty:ty),*) => {$(
        impl Encode for $ty {
            fn write_to<W>(&self, writer: &mut W) -> std::io::Result<usize>
            where
                W: std::io::Write,
            {
                writer.write_all(&self.to_be_bytes())?;
                Ok(std::mem::size_of::<$ty>())
            }
        }

        impl Decode for $ty {
            fn read_from<R>(reader: &mut R) -> Result<Self, CctprError>
            where
                R: std::io::Read,
                Self: Sized,
            {
                let mut buf = [0; std::mem::size_of::<$ty>()];
                reader.read_exact(&mut buf)?;
                Ok(<$ty>::from_be_bytes(buf))
            }
        }
    )*};
}

impl_uint_codec!(u8, u16, u32, u64, u128, i16);

impl Encode for H160 {
    fn write_to<W>(&self, writer: &mut W) -> std::io::Result<usize>
    where
        W: std::io::Write,
    {
        writer.write_all(self.as_ref())?;
        Ok(20)
    }
}

impl Decode for H160 {
    fn read_from<R>(reader: &mut R) -> Result<Self, CctprError>
    where
        R: std::io::Read,
        Self: Sized,
    {
        let mut addr = H160::default();
        reader.read_exact(addr.as_mut())?;
        Ok(addr)
    }
}

impl Encode for H256 {
    fn write_to<W>(&self, writer: &mut W) -> std::io::Result<usize>
    where
        W: std::io::Write,
    {
        writer.write_all(self.as_ref())?;
        Ok(32)
    }
}

impl Decode for H256 {
    fn read_from<R>(reader: &mut R) -> Result<Self, CctprError>
    where
        R: std::io::Read,
        Self: Sized,
    {
        let mut digest = H256::default();
        reader.read_exact(digest.as_mut())?;
        Ok(digest)
    }
}

impl Encode for U256 {
    fn write_to<W>(&self, writer: &mut W) -> std::io::Result<usize>
    where
        W: std::io::Write,
    {
        let mut buf = [0; 32];
        self.to_big_endian(&mut buf);
        writer.write_all(&buf)?;
        Ok(32)
    }
}

impl Decode for U256 {
    fn read_from<R>(reader: &mut R) -> Result<Self, CctprError>
    where
        R: std::io::Read,
        Self: Sized,
    {
        let mut buf = [0; 32];
        reader.read_exact(&mut buf)?;
        Ok(U256::from_big_endian(&buf))
    }
}

impl Encode for bool {
    fn write_to<W>(&self, writer: &mut W) -> std::io::Result<usize>
    where
        W: std::io::Write,
    {
        writer.write_all(&[u8::from(*self)])?;
        Ok(1)
    }
}

impl Decode for bool {
    fn read_from<R>(reader: &mut R) -> Result<Self, CctprError>
    where
        R: std::io::Read,
        Self: Sized,
    {
        match u8::read_from(reader)? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(Error::new(ErrorKind::InvalidData, "decoded bool invalid").into()),
        }
    }
}

/// `r ‖ s ‖ v`
impl Encode for Signature {
    fn write_to<W>(&self, writer: &mut W) -> std::io::Result<usize>
    where
        W: std::io::Write,
    {
        let bytes: [u8; 65] = (*self).into();
        writer.write_all(&bytes)?;
        Ok(65)
    }
}

impl Decode for Signature {
    fn read_from<R>(reader: &mut R) -> Result<Self, CctprError>
    where
        R: std::io::Read,
        Self: Sized,
    {
        let mut buf = [0; 65];
        reader.read_exact(&mut buf)?;
        Ok(Signature::try_from(buf.as_slice())?)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn big_endian_primitives() {
        assert_eq!(0x0102u16.to_vec(), vec![1, 2]);
        assert_eq!((-2i16).to_vec(), vec![0xff, 0xfe]);
        assert_eq!(U256::from(0x0a0b).to_vec()[30..], [0x0a, 0x0b]);
        assert_eq!(u64::from_slice(&[0, 0, 0, 0, 0, 0, 1, 0]).unwrap(), 256);
        assert!(u32::from_slice(&[0, 0, 0, 0, 0]).is_err());
        assert!(u32::from_slice(&[0, 0, 0]).is_err());
        assert!(bool::from_slice(&[2]).is_err());
    }
}
