use core::fmt;

/// Structural errors when taking apart byte buffers: modem frames, network packets
/// and logical payloads. FEC and checksum failures are not errors, the codecs report
/// those through Option/bool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecErr {
    InvalidMagic { expected: &'static str },
    InvalidType { expected: u64, found: u64 },
    BufferEnded { field: Option<&'static str> },
    InvalidValue { field: &'static str, value: u64 },
    InconsistentLength { expected: usize, found: usize },
    Unsupported { field: &'static str, value: u64 },
}

impl fmt::Display for CodecErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecErr::InvalidMagic { expected } => write!(f, "invalid magic, expected {}", expected),
            CodecErr::InvalidType { expected, found } => write!(f, "invalid type 0x{:02X}, expected 0x{:02X}", found, expected),
            CodecErr::BufferEnded { field: Some(field) } => write!(f, "buffer ended while reading {}", field),
            CodecErr::BufferEnded { field: None } => write!(f, "buffer ended"),
            CodecErr::InvalidValue { field, value } => write!(f, "invalid value {} for {}", value, field),
            CodecErr::InconsistentLength { expected, found } => write!(f, "length {} does not match expected {}", found, expected),
            CodecErr::Unsupported { field, value } => write!(f, "unsupported {} 0x{:02X}", field, value),
        }
    }
}

impl std::error::Error for CodecErr {}

/// Checks whether a type field matches the expected enum value. If not, returns CodecErr::InvalidType
#[macro_export]
macro_rules! expect_type {
    ($value:expr, $expected:expr) => {{
        let raw_expected = $expected.into_raw() as u64;
        let found = $value as u64;
        if found == raw_expected {
            Ok(())
        } else {
            Err($crate::codec_error::CodecErr::InvalidType { expected: raw_expected, found })
        }
    }};
}

/// Checks whether a value matches an expected value. If not, returns CodecErr::InvalidValue
#[macro_export]
macro_rules! expect_value {
    ($value:ident, $expected:expr) => {
        $crate::expect_value!(@inner $value, $expected, stringify!($value))
    };
    ($value:expr, $expected:expr, $field:expr) => {
        $crate::expect_value!(@inner $value, $expected, $field)
    };

    (@inner $value:expr, $expected:expr, $field:expr) => {{
        let val = $value;
        if val == $expected {
            Ok(())
        } else {
            Err($crate::codec_error::CodecErr::InvalidValue {
                field: $field,
                value: val as u64,
            })
        }
    }};
}

/// Checks that a buffer has exactly the expected length. If not, returns CodecErr::InconsistentLength
#[macro_export]
macro_rules! expect_len {
    ($buf:expr, $expected:expr) => {{
        let found = $buf.len();
        if found == $expected {
            Ok(())
        } else {
            Err($crate::codec_error::CodecErr::InconsistentLength { expected: $expected, found })
        }
    }};
}

#[macro_export]
macro_rules! let_field {
    ($buf:expr, $ident:ident, $bits:expr) => {
        let $ident = $buf.read_field($bits, stringify!($ident))?;
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy)]
    enum Kind {
        Data = 0x18,
    }
    impl Kind {
        fn into_raw(self) -> u8 {
            self as u8
        }
    }

    #[test]
    fn test_macros() {
        let ok: Result<(), CodecErr> = expect_type!(0x18u8, Kind::Data);
        assert!(ok.is_ok());
        let err: Result<(), CodecErr> = expect_type!(0x1Au8, Kind::Data);
        assert_eq!(err, Err(CodecErr::InvalidType { expected: 0x18, found: 0x1A }));

        let marker = 0xE1u8;
        let err: Result<(), CodecErr> = expect_value!(marker, 0xE0);
        assert_eq!(err, Err(CodecErr::InvalidValue { field: "marker", value: 0xE1 }));

        let buf = [0u8; 5];
        let err: Result<(), CodecErr> = expect_len!(buf, 6);
        assert_eq!(err, Err(CodecErr::InconsistentLength { expected: 6, found: 5 }));
    }
}
