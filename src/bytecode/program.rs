use std::fmt;

use crate::memory::MEMORY_SIZE;

/// Size of the image header: origin (2 bytes), length (1 byte) and checksum (1 byte).
pub const HEADER_SIZE: usize = 4;

/// Largest body the one byte length field can describe, in words.
pub const MAX_WORDS: usize = 0xFF;

/// Errors raised while building or decoding a program image.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageError {
    /// The image ends before the header or the body is complete, or it has trailing bytes.
    Truncated {
        expected: usize,
        found: usize,
    },

    /// The origin does not fit in 12 bits.
    InvalidOrigin {
        origin: u16,
    },

    ChecksumMismatch {
        expected: u8,
        found: u8,
    },

    /// The body has more words than the length field can count.
    TooLong {
        words: usize,
    },
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ImageError::Truncated { expected, found } =>
                write!(f, "expected an image of {} bytes, found {} bytes", expected, found),
            ImageError::InvalidOrigin { origin } =>
                write!(f, "origin {:#06x} is outside of memory", origin),
            ImageError::ChecksumMismatch { expected, found } =>
                write!(f, "checksum mismatch: header says {:#04x}, computed {:#04x}", found, expected),
            ImageError::TooLong { words } =>
                write!(f, "{} words do not fit in the length field of the image", words),
        }
    }
}

impl std::error::Error for ImageError {}

/// A program image: the body bytes and the address they are meant to be loaded at.
///
/// Serialized as `origin (2 bytes, big-endian) | length (words) | checksum | body`, where the
/// checksum is the wrapping sum of the three bytes before it.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub origin: u16,

    /// Body bytes, always an even number of them.
    pub body: Vec<u8>,

    /// Address execution starts from. Not part of the serialized image.
    pub entry: u16,
}

impl Program {
    /// Creates an image, padding an odd body with a zero byte.
    pub fn new(origin: u16, mut body: Vec<u8>, entry: u16) -> Result<Program, ImageError> {
        if origin as usize >= MEMORY_SIZE {
            return Err(ImageError::InvalidOrigin { origin });
        }

        if body.len() % 2 == 1 {
            body.push(0);
        }

        let words = body.len() / 2;

        if words > MAX_WORDS {
            return Err(ImageError::TooLong { words });
        }

        Ok(Program { origin, body, entry })
    }

    /// Length of the body in 2-byte words.
    pub fn length(&self) -> usize {
        self.body.len() / 2
    }

    fn header(&self) -> [u8; 3] {
        let [high, low] = self.origin.to_be_bytes();
        [high, low, self.length() as u8]
    }

    pub fn checksum(&self) -> u8 {
        self.header()
            .iter()
            .fold(0u8, |sum, byte| sum.wrapping_add(*byte))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_SIZE + self.body.len());

        bytes.extend_from_slice(&self.header());
        bytes.push(self.checksum());
        bytes.extend_from_slice(&self.body);

        bytes
    }

    /// Decodes a serialized image. The entry point of a decoded image is its origin.
    pub fn from_bytes(bytes: &[u8]) -> Result<Program, ImageError> {
        let (header, body) = match bytes {
            [high, low, length, checksum, body @ ..] => ([*high, *low, *length, *checksum], body),
            _ => return Err(ImageError::Truncated {
                expected: HEADER_SIZE,
                found: bytes.len(),
            }),
        };

        let origin = u16::from_be_bytes([header[0], header[1]]);

        if origin as usize >= MEMORY_SIZE {
            return Err(ImageError::InvalidOrigin { origin });
        }

        let expected = header[..3]
            .iter()
            .fold(0u8, |sum, byte| sum.wrapping_add(*byte));

        if expected != header[3] {
            return Err(ImageError::ChecksumMismatch { expected, found: header[3] });
        }

        let length = header[2] as usize * 2;

        if body.len() != length {
            return Err(ImageError::Truncated {
                expected: HEADER_SIZE + length,
                found: bytes.len(),
            });
        }

        Ok(Program {
            origin,
            body: body.to_vec(),
            entry: origin,
        })
    }
}

#[test]
fn test_image_layout() {
    let program = Program::new(0x000, vec![0x80, 0x05], 0).unwrap();
    assert_eq!(program.length(), 1);
    assert_eq!(program.checksum(), 0x01);
    assert_eq!(program.to_bytes(), vec![0x00, 0x00, 0x01, 0x01, 0x80, 0x05]);

    let program = Program::new(0x1F0, vec![0x30, 0x01, 0x07], 0x1F0).unwrap();
    assert_eq!(program.body, vec![0x30, 0x01, 0x07, 0x00]);
    assert_eq!(program.checksum(), 0x01u8.wrapping_add(0xF0).wrapping_add(0x02));
}

#[test]
fn test_image_limits() {
    assert_eq!(
        Program::new(0x1000, Vec::new(), 0),
        Err(ImageError::InvalidOrigin { origin: 0x1000 }),
    );
    assert!(Program::new(0, vec![0; 2 * MAX_WORDS], 0).is_ok());
    assert_eq!(
        Program::new(0, vec![0; 2 * MAX_WORDS + 1], 0),
        Err(ImageError::TooLong { words: MAX_WORDS + 1 }),
    );
}

#[test]
fn test_from_bytes() {
    let program = Program::from_bytes(&[0x01, 0x00, 0x01, 0x02, 0xF0, 0x00]).unwrap();
    assert_eq!(program.origin, 0x100);
    assert_eq!(program.entry, 0x100);
    assert_eq!(program.body, vec![0xF0, 0x00]);

    assert_eq!(
        Program::from_bytes(&[0x00, 0x00]),
        Err(ImageError::Truncated { expected: 4, found: 2 }),
    );
    assert_eq!(
        Program::from_bytes(&[0x00, 0x00, 0x01, 0x07, 0x80, 0x05]),
        Err(ImageError::ChecksumMismatch { expected: 0x01, found: 0x07 }),
    );
    assert_eq!(
        Program::from_bytes(&[0x00, 0x00, 0x02, 0x02, 0x80, 0x05]),
        Err(ImageError::Truncated { expected: 8, found: 6 }),
    );
    assert_eq!(
        Program::from_bytes(&[0x10, 0x00, 0x00, 0x10]),
        Err(ImageError::InvalidOrigin { origin: 0x1000 }),
    );
}
