use anyhow::Result;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoder {
    Plain,
    Url,
    Base64,
}

impl Encoder {
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "plain" => Ok(Encoder::Plain),
            "url" | "urlencode" => Ok(Encoder::Url),
            "base64" => Ok(Encoder::Base64),
            other => anyhow::bail!("unknown encoder: {other}"),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Encoder::Plain => "plain",
            Encoder::Url => "url",
            Encoder::Base64 => "base64",
        }
    }

    pub fn apply(&self, payload: &str) -> String {
        match self {
            Encoder::Plain => payload.to_string(),
            Encoder::Url => urlencoding::encode(payload).to_string(),
            Encoder::Base64 => BASE64.encode(payload.as_bytes()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_encoders() {
        assert_eq!(Encoder::parse("plain").unwrap(), Encoder::Plain);
        assert_eq!(Encoder::parse("URL").unwrap(), Encoder::Url);
        assert_eq!(Encoder::parse("Base64").unwrap(), Encoder::Base64);
        assert!(Encoder::parse("rot13").is_err());
    }

    #[test]
    fn test_plain_is_identity() {
        assert_eq!(Encoder::Plain.apply("<script>"), "<script>");
    }

    #[test]
    fn test_url_encoding() {
        assert_eq!(
            Encoder::Url.apply("' OR 1=1"),
            "%27%20OR%201%3D1"
        );
    }

    #[test]
    fn test_base64_encoding() {
        assert_eq!(Encoder::Base64.apply("abc"), "YWJj");
    }
}
