//! Server response grammar: terminal status lines and `VALUE` headers.

use crate::error::ProtocolError;

/// The closed vocabulary of terminal response lines.
///
/// Every status response is matched against this set; anything outside it
/// is carried verbatim in [`ResponseLine::Other`] for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseLine {
    Stored,
    NotStored,
    Exists,
    NotFound,
    Deleted,
    Ok,
    End,
    /// A line outside the known vocabulary, CRLF trimmed.
    Other(String),
}

impl ResponseLine {
    /// Classifies a full response line, CRLF included.
    pub fn parse(line: &[u8]) -> Self {
        match line {
            b"STORED\r\n" => ResponseLine::Stored,
            b"NOT_STORED\r\n" => ResponseLine::NotStored,
            b"EXISTS\r\n" => ResponseLine::Exists,
            b"NOT_FOUND\r\n" => ResponseLine::NotFound,
            b"DELETED\r\n" => ResponseLine::Deleted,
            b"OK\r\n" => ResponseLine::Ok,
            b"END\r\n" => ResponseLine::End,
            other => ResponseLine::Other(
                String::from_utf8_lossy(other).trim_end().to_string(),
            ),
        }
    }
}

/// A parsed `VALUE <key> <flags> <len> [<cas_id>]` header line.
///
/// The CAS-bearing form is distinguished from the plain form by the number
/// of space-delimited tokens; `cas_id` is zero when the server omits it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueHeader {
    pub key: String,
    pub flags: u32,
    pub len: usize,
    pub cas_id: u64,
}

impl ValueHeader {
    /// Parses a header line, CRLF included.
    pub fn parse(line: &[u8]) -> Result<Self, ProtocolError> {
        let text = std::str::from_utf8(line).map_err(|_| ProtocolError::InvalidUtf8)?;
        let text = text.strip_suffix("\r\n").unwrap_or(text);
        let malformed = || ProtocolError::BadValueHeader(text.to_string());

        let tokens: Vec<&str> = text.split(' ').collect();
        if tokens.len() != 4 && tokens.len() != 5 {
            return Err(malformed());
        }
        if tokens[0] != "VALUE" {
            return Err(malformed());
        }

        let key = tokens[1].to_string();
        let flags: u32 = tokens[2].parse().map_err(|_| malformed())?;
        let len: usize = tokens[3].parse().map_err(|_| malformed())?;
        let cas_id: u64 = match tokens.get(4) {
            Some(token) => token.parse().map_err(|_| malformed())?,
            None => 0,
        };

        Ok(Self {
            key,
            flags,
            len,
            cas_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_lines() {
        assert_eq!(ResponseLine::parse(b"STORED\r\n"), ResponseLine::Stored);
        assert_eq!(
            ResponseLine::parse(b"NOT_STORED\r\n"),
            ResponseLine::NotStored
        );
        assert_eq!(ResponseLine::parse(b"EXISTS\r\n"), ResponseLine::Exists);
        assert_eq!(ResponseLine::parse(b"NOT_FOUND\r\n"), ResponseLine::NotFound);
        assert_eq!(ResponseLine::parse(b"DELETED\r\n"), ResponseLine::Deleted);
        assert_eq!(ResponseLine::parse(b"OK\r\n"), ResponseLine::Ok);
        assert_eq!(ResponseLine::parse(b"END\r\n"), ResponseLine::End);
    }

    #[test]
    fn test_unknown_line_carries_raw_text() {
        let line = ResponseLine::parse(b"SERVER_ERROR out of memory\r\n");
        assert_eq!(
            line,
            ResponseLine::Other("SERVER_ERROR out of memory".to_string())
        );
    }

    #[test]
    fn test_vocabulary_match_is_exact() {
        // Missing terminator or extra payload must not classify as a
        // known line.
        assert!(matches!(
            ResponseLine::parse(b"STORED"),
            ResponseLine::Other(_)
        ));
        assert!(matches!(
            ResponseLine::parse(b"STORED extra\r\n"),
            ResponseLine::Other(_)
        ));
    }

    #[test]
    fn test_value_header_without_cas() {
        let header = ValueHeader::parse(b"VALUE color 0 3\r\n").unwrap();
        assert_eq!(header.key, "color");
        assert_eq!(header.flags, 0);
        assert_eq!(header.len, 3);
        assert_eq!(header.cas_id, 0);
    }

    #[test]
    fn test_value_header_with_cas() {
        let header = ValueHeader::parse(b"VALUE color 1 3 99\r\n").unwrap();
        assert_eq!(header.key, "color");
        assert_eq!(header.flags, 1);
        assert_eq!(header.len, 3);
        assert_eq!(header.cas_id, 99);
    }

    #[test]
    fn test_value_header_large_flags() {
        // Chunk marker set by the client round-trips through the header.
        let flags = 1u32 << 30;
        let line = format!("VALUE k {flags} 7 1\r\n");
        let header = ValueHeader::parse(line.as_bytes()).unwrap();
        assert_eq!(header.flags, flags);
    }

    #[test]
    fn test_value_header_malformed() {
        for line in [
            &b"VALUE color 0\r\n"[..],
            b"VALUE color 0 3 99 extra\r\n",
            b"VALUE color x 3\r\n",
            b"VALUE color 0 x\r\n",
            b"VALUE color 0 3 x\r\n",
            b"VALUES color 0 3\r\n",
            b"garbage\r\n",
        ] {
            let err = ValueHeader::parse(line).unwrap_err();
            assert!(
                matches!(err, ProtocolError::BadValueHeader(_)),
                "line {:?} should be malformed",
                line
            );
        }
    }

    #[test]
    fn test_value_header_invalid_utf8() {
        let err = ValueHeader::parse(b"VALUE \xff\xfe 0 3\r\n").unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidUtf8));
    }
}
