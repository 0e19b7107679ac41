//! Wire types for the JSON-lines transport.
//!
//! Every line on stdin is one [`Request`]; every line on stdout is either a
//! [`Response`] (correlated by `seq`) or a [`Notification`].

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use mc_convert::ConversionJob;
use mc_core::{Error, JobId, MediaKind, Notification};

/// A request line as read from the wire, before the method is resolved.
#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub seq: Option<u64>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// A request with its method and parameters resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Convert(ConversionJob),
    CancelItem(JobId),
    CancelAll,
    Formats(MediaKind),
    Tools,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConvertParams {
    id: JobId,
    file_path: PathBuf,
    output_format: String,
    save_directory: PathBuf,
    media_type: String,
}

#[derive(Debug, Deserialize)]
struct CancelParams {
    id: JobId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FormatsParams {
    media_type: String,
}

fn params<T: serde::de::DeserializeOwned>(method: &str, value: Value) -> mc_core::Result<T> {
    serde_json::from_value(value)
        .map_err(|e| Error::Validation(format!("invalid params for {method}: {e}")))
}

impl Request {
    /// Parse one line of input.
    pub fn parse(line: &str) -> mc_core::Result<Self> {
        serde_json::from_str(line).map_err(|e| Error::Validation(format!("malformed request: {e}")))
    }

    /// Best-effort `seq` of a line that failed to parse as a request.
    pub fn recover_seq(line: &str) -> Option<u64> {
        serde_json::from_str::<Value>(line).ok()?.get("seq")?.as_u64()
    }

    /// Resolve the method name and decode its parameters.
    ///
    /// An unknown `mediaType` fails here with
    /// [`Error::UnsupportedMediaKind`], before any job is dispatched.
    pub fn into_call(self) -> mc_core::Result<Call> {
        let method = self.method.as_str();
        match method {
            "convert" => {
                let p: ConvertParams = params(method, self.params)?;
                let kind = MediaKind::from_str(&p.media_type)?;
                Ok(Call::Convert(ConversionJob::new(
                    p.id,
                    kind,
                    p.file_path,
                    p.output_format,
                    p.save_directory,
                )))
            }
            "cancel_item" => {
                let p: CancelParams = params(method, self.params)?;
                Ok(Call::CancelItem(p.id))
            }
            "cancel_all" => Ok(Call::CancelAll),
            "formats" => {
                let p: FormatsParams = params(method, self.params)?;
                Ok(Call::Formats(MediaKind::from_str(&p.media_type)?))
            }
            "tools" => Ok(Call::Tools),
            other => Err(Error::Validation(format!("unknown method: {other}"))),
        }
    }
}

/// Error payload of a failed response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
}

impl From<&Error> for ErrorBody {
    fn from(err: &Error) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

/// Reply to a single request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub seq: Option<u64>,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl Response {
    pub fn ok(seq: Option<u64>, result: impl Serialize) -> Self {
        match serde_json::to_value(result) {
            Ok(value) => Self {
                seq,
                ok: true,
                result: Some(value),
                error: None,
            },
            Err(e) => Self::error(seq, &Error::Internal(format!("failed to encode result: {e}"))),
        }
    }

    pub fn error(seq: Option<u64>, err: &Error) -> Self {
        Self {
            seq,
            ok: false,
            result: None,
            error: Some(ErrorBody::from(err)),
        }
    }

    pub fn from_result<T: Serialize>(seq: Option<u64>, result: &mc_core::Result<T>) -> Self {
        match result {
            Ok(value) => Self::ok(seq, value),
            Err(e) => Self::error(seq, e),
        }
    }
}

/// Anything written to stdout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Outbound {
    Response(Response),
    Notification(Notification),
}

impl From<Response> for Outbound {
    fn from(response: Response) -> Self {
        Self::Response(response)
    }
}

impl From<Notification> for Outbound {
    fn from(notification: Notification) -> Self {
        Self::Notification(notification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn convert_request() {
        let req = Request::parse(
            r#"{"seq": 1, "method": "convert", "params": {"id": "1", "filePath": "/a/video.mov", "outputFormat": "mp4", "saveDirectory": "/out", "mediaType": "video"}}"#,
        )
        .unwrap();
        assert_eq!(req.seq, Some(1));

        let call = req.into_call().unwrap();
        assert_eq!(
            call,
            Call::Convert(ConversionJob::new("1", MediaKind::Video, "/a/video.mov", "mp4", "/out"))
        );
    }

    #[test]
    fn unknown_media_type_rejected_while_parsing() {
        let req = Request::parse(
            r#"{"seq": 2, "method": "convert", "params": {"id": "1", "filePath": "/a/doc.pdf", "outputFormat": "txt", "saveDirectory": "/out", "mediaType": "document"}}"#,
        )
        .unwrap();
        assert_matches!(req.into_call(), Err(Error::UnsupportedMediaKind(kind)) if kind == "document");
    }

    #[test]
    fn methods_without_params() {
        let req = Request::parse(r#"{"seq": 3, "method": "cancel_all"}"#).unwrap();
        assert_eq!(req.into_call().unwrap(), Call::CancelAll);

        let req = Request::parse(r#"{"method": "tools"}"#).unwrap();
        assert_eq!(req.seq, None);
        assert_eq!(req.into_call().unwrap(), Call::Tools);
    }

    #[test]
    fn bad_params_and_methods() {
        let req = Request::parse(r#"{"seq": 4, "method": "cancel_item", "params": {}}"#).unwrap();
        assert_matches!(req.into_call(), Err(Error::Validation(_)));

        let req = Request::parse(r#"{"seq": 5, "method": "explode"}"#).unwrap();
        assert_matches!(req.into_call(), Err(Error::Validation(msg)) if msg.contains("explode"));

        assert_matches!(Request::parse("{not json"), Err(Error::Validation(_)));
        assert_matches!(Request::parse(r#"{"seq": 6}"#), Err(Error::Validation(_)));
        assert_eq!(Request::recover_seq(r#"{"seq": 6}"#), Some(6));
        assert_eq!(Request::recover_seq("{not json"), None);
    }

    #[test]
    fn response_shapes() {
        let ok = serde_json::to_value(Response::ok(Some(1), "/out/video.mp4")).unwrap();
        assert_eq!(ok, json!({"seq": 1, "ok": true, "result": "/out/video.mp4"}));

        let err = Response::error(Some(1), &Error::cancelled(&JobId::from("1")));
        let err = serde_json::to_value(err).unwrap();
        assert_eq!(err["ok"], json!(false));
        assert_eq!(err["error"]["kind"], json!("cancelled"));
        assert!(err.get("result").is_none());

        let unknown = serde_json::to_value(Response::error(None, &Error::Validation("x".into()))).unwrap();
        assert_eq!(unknown["seq"], Value::Null);
    }

    #[test]
    fn outbound_is_untagged() {
        let line = serde_json::to_string(&Outbound::from(Notification::Cancelled {
            id: JobId::from("9"),
        }))
        .unwrap();
        assert_eq!(line, r#"{"event":"cancelled","id":"9"}"#);
    }
}
