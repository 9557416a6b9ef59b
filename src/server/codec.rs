//! Framing for the out-of-band `getstatus` query.
//!
//! Requests are `FF FF FF FF <command> \n`. Replies start with a header line
//! (`FF FF FF FF statusResponse`), then an info line of backslash separated
//! fields alternating key, value, then one line per player which we ignore.

pub const OUT_OF_BAND_MARKER: [u8; 4] = [0xFF, 0xFF, 0xFF, 0xFF];
pub const STATUS_COMMAND: &str = "getstatus";
const DELIMITER: char = '\\';

/// Key/value pairs in reply order, keys lower-cased.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawQueryReply {
    fields: Vec<(String, String)>,
}

impl RawQueryReply {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Value of the first field whose key is any of `keys`, in reply order.
    pub fn first_of(&self, keys: &[&str]) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| keys.contains(&key.as_str()))
            .map(|(_, value)| value.as_str())
    }

    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

pub fn encode(command: &str) -> Vec<u8> {
    let mut request = Vec::with_capacity(OUT_OF_BAND_MARKER.len() + command.len() + 1);
    request.extend_from_slice(&OUT_OF_BAND_MARKER);
    request.extend_from_slice(command.as_bytes());
    request.push(b'\n');
    request
}

pub fn decode(raw: &[u8]) -> RawQueryReply {
    let text = String::from_utf8_lossy(raw);
    let Some(start) = text.find(DELIMITER) else {
        return RawQueryReply::default();
    };

    // everything before the first delimiter is the header
    let info = &text[start + 1..];
    let info = info.split('\n').next().unwrap_or_default();
    let parts = info.split(DELIMITER).collect::<Vec<_>>();
    // chunks_exact drops a trailing key that has no value
    let fields = parts
        .chunks_exact(2)
        .map(|pair| (pair[0].to_lowercase(), pair[1].trim_end_matches('\r').to_owned()))
        .collect();
    RawQueryReply { fields }
}
