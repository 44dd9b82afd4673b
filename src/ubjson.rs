//! Universal Binary JSON decoding into [`serde_json::Value`].
//!
//! XGBoost writes `.ubj` (and, since 2.1, `.xgb`) models in this encoding.
//! Decoding to a `Value` lets the same serde document types read both
//! encodings. Supports the full draft-12 marker set including optimized
//! (`$` typed, `#` counted) containers.

use anyhow::{anyhow, bail, Context};
use serde_json::{Map, Number, Value};

const MAX_DEPTH: usize = 128;

/// Decodes one UBJSON value spanning the whole input.
pub fn decode(bytes: &[u8]) -> anyhow::Result<Value> {
    let mut reader = Reader { bytes, pos: 0 };
    let marker = reader.marker()?;
    let value = reader.value(marker, 0)?;
    if reader.pos != bytes.len() {
        bail!(
            "trailing bytes after UBJSON value at offset {} of {}",
            reader.pos,
            bytes.len()
        );
    }
    Ok(value)
}

/// True when `bytes` look like a UBJSON object rather than JSON text.
///
/// Both start with `{`; a UBJSON key begins with an integer length marker
/// (or an optimized-container `$`/`#`), which JSON text never does.
pub fn looks_like_ubjson(bytes: &[u8]) -> bool {
    matches!(
        bytes,
        [b'{', b'i' | b'U' | b'I' | b'l' | b'L' | b'$' | b'#', ..]
    )
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> anyhow::Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| anyhow!("unexpected end of UBJSON input at offset {}", self.pos))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> anyhow::Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn byte(&mut self) -> anyhow::Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    /// Next marker, skipping no-op padding.
    fn marker(&mut self) -> anyhow::Result<u8> {
        loop {
            let m = self.byte()?;
            if m != b'N' {
                return Ok(m);
            }
        }
    }

    fn integer(&mut self, marker: u8) -> anyhow::Result<i64> {
        Ok(match marker {
            b'i' => i8::from_be_bytes(self.array()?) as i64,
            b'U' => self.byte()? as i64,
            b'I' => i16::from_be_bytes(self.array()?) as i64,
            b'l' => i32::from_be_bytes(self.array()?) as i64,
            b'L' => i64::from_be_bytes(self.array()?),
            other => bail!(
                "expected an integer marker, found {:?} at offset {}",
                other as char,
                self.pos - 1
            ),
        })
    }

    /// A length prefix: integer marker plus value, never negative.
    fn length(&mut self) -> anyhow::Result<usize> {
        let marker = self.byte()?;
        let n = self.integer(marker)?;
        usize::try_from(n).map_err(|_| anyhow!("negative UBJSON length {}", n))
    }

    fn string(&mut self) -> anyhow::Result<String> {
        let len = self.length()?;
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec()).context("UBJSON string is not valid UTF-8")
    }

    fn value(&mut self, marker: u8, depth: usize) -> anyhow::Result<Value> {
        if depth > MAX_DEPTH {
            bail!("UBJSON nesting deeper than {}", MAX_DEPTH);
        }
        Ok(match marker {
            b'Z' => Value::Null,
            b'T' => Value::Bool(true),
            b'F' => Value::Bool(false),
            b'i' | b'U' | b'I' | b'l' | b'L' => Value::from(self.integer(marker)?),
            b'd' => float(f32::from_be_bytes(self.array()?) as f64),
            b'D' => float(f64::from_be_bytes(self.array()?)),
            b'H' => {
                let digits = self.string()?;
                serde_json::from_str::<Number>(&digits)
                    .map(Value::Number)
                    .with_context(|| format!("invalid high-precision number '{}'", digits))?
            }
            b'C' => Value::String((self.byte()? as char).to_string()),
            b'S' => Value::String(self.string()?),
            b'[' => self.container(depth, false)?,
            b'{' => self.container(depth, true)?,
            other => bail!(
                "unknown UBJSON marker {:?} at offset {}",
                other as char,
                self.pos - 1
            ),
        })
    }

    fn container(&mut self, depth: usize, object: bool) -> anyhow::Result<Value> {
        let mut elem_type = None;
        if self.peek() == Some(b'$') {
            self.pos += 1;
            elem_type = Some(self.byte()?);
        }
        let count = if self.peek() == Some(b'#') {
            self.pos += 1;
            Some(self.length()?)
        } else {
            None
        };
        if elem_type.is_some() && count.is_none() {
            bail!("typed UBJSON container without a count at offset {}", self.pos);
        }

        // Never trust a count for preallocation beyond what the input could hold.
        let capacity = count.unwrap_or(0).min(self.bytes.len() - self.pos);
        let mut items = Vec::with_capacity(if object { 0 } else { capacity });
        let mut map = Map::new();
        let mut read = 0usize;

        loop {
            match count {
                Some(n) if read == n => break,
                None => {
                    let close = if object { b'}' } else { b']' };
                    while self.peek() == Some(b'N') {
                        self.pos += 1;
                    }
                    if self.peek() == Some(close) {
                        self.pos += 1;
                        break;
                    }
                }
                _ => {}
            }

            let key = if object { Some(self.string()?) } else { None };
            let marker = match elem_type {
                Some(t) => t,
                None => self.marker()?,
            };
            let value = self.value(marker, depth + 1)?;
            match key {
                Some(key) => {
                    map.insert(key, value);
                }
                None => items.push(value),
            }
            read += 1;
        }

        Ok(if object {
            Value::Object(map)
        } else {
            Value::Array(items)
        })
    }
}

/// Non-finite floats have no JSON representation and decode as null.
fn float(f: f64) -> Value {
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decodes_xgboost_style_document() {
        // {"name": "gbtree", "left": [$l#U2 1 -1], "cond": [$d#U2 0.5 -1.5], "n": 3, "ok": T}
        let mut bytes = vec![b'{'];
        bytes.extend([b'U', 4]);
        bytes.extend(b"name");
        bytes.extend([b'S', b'U', 6]);
        bytes.extend(b"gbtree");
        bytes.extend([b'U', 4]);
        bytes.extend(b"left");
        bytes.extend([b'[', b'$', b'l', b'#', b'U', 2]);
        bytes.extend(1i32.to_be_bytes());
        bytes.extend((-1i32).to_be_bytes());
        bytes.extend([b'U', 4]);
        bytes.extend(b"cond");
        bytes.extend([b'[', b'$', b'd', b'#', b'L']);
        bytes.extend(2i64.to_be_bytes());
        bytes.extend(0.5f32.to_be_bytes());
        bytes.extend((-1.5f32).to_be_bytes());
        bytes.extend([b'U', 1, b'n', b'i', 3]);
        bytes.extend([b'U', 2]);
        bytes.extend(b"ok");
        bytes.push(b'T');
        bytes.push(b'}');

        assert!(looks_like_ubjson(&bytes));
        assert_eq!(
            decode(&bytes).unwrap(),
            json!({"name": "gbtree", "left": [1, -1], "cond": [0.5, -1.5], "n": 3, "ok": true})
        );
    }

    #[test]
    fn test_json_text_is_not_ubjson() {
        assert!(!looks_like_ubjson(br#"{"learner": {}}"#));
        assert!(!looks_like_ubjson(b"{\n  \"learner\": {}}"));
        assert!(!looks_like_ubjson(b"binf"));
    }

    #[test]
    fn test_nan_decodes_as_null() {
        let mut bytes = vec![b'[', b'd'];
        bytes.extend(f32::NAN.to_be_bytes());
        bytes.push(b']');
        assert_eq!(decode(&bytes).unwrap(), json!([null]));
    }

    #[test]
    fn test_truncated_input_is_an_error() {
        let bytes = [b'[', b'$', b'l', b'#', b'U', 4, 0, 0, 0, 1];
        assert!(decode(&bytes).is_err());
        assert!(decode(b"{").is_err());
        assert!(decode(&[b'[', b']', b'Z']).is_err());
    }
}
