// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Persistence codecs: payload <-> byte stream.

use std::fmt;
use std::io::{self, Read, Write};

use serde::de::DeserializeOwned;
use serde::Serialize;

pub trait PersistenceCodec<G>: Send + Sync {
    /// Short lowercase name of the produced format (also used as the native export format).
    fn format_name(&self) -> &str;

    fn decode(&self, input: &mut dyn Read) -> Result<G, CodecError>;

    fn encode(&self, graph: &G, output: &mut dyn Write) -> Result<(), CodecError>;
}

/// Encodes into memory first so a failing codec never leaves a half-written destination.
pub(crate) fn encode_to_vec<G>(
    codec: &dyn PersistenceCodec<G>,
    graph: &G,
) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::new();
    codec.encode(graph, &mut buf)?;
    Ok(buf)
}

#[derive(Debug)]
pub enum CodecError {
    Json(serde_json::Error),
    Io(io::Error),
    UnsupportedContent(String),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(source) => write!(f, "malformed document: {source}"),
            Self::Io(source) => write!(f, "codec stream error: {source}"),
            Self::UnsupportedContent(detail) => write!(f, "unsupported document content: {detail}"),
        }
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(source) => Some(source),
            Self::Io(source) => Some(source),
            Self::UnsupportedContent(_) => None,
        }
    }
}

impl From<serde_json::Error> for CodecError {
    fn from(source: serde_json::Error) -> Self {
        if source.is_io() {
            Self::Io(source.into())
        } else {
            Self::Json(source)
        }
    }
}

/// Pretty-printed JSON for any serde payload, newline-terminated.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct JsonCodec;

impl<G> PersistenceCodec<G> for JsonCodec
where
    G: Serialize + DeserializeOwned,
{
    fn format_name(&self) -> &str {
        "json"
    }

    fn decode(&self, input: &mut dyn Read) -> Result<G, CodecError> {
        Ok(serde_json::from_reader(input)?)
    }

    fn encode(&self, graph: &G, output: &mut dyn Write) -> Result<(), CodecError> {
        serde_json::to_writer_pretty(&mut *output, graph)?;
        output.write_all(b"\n").map_err(CodecError::Io)?;
        output.flush().map_err(CodecError::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::{encode_to_vec, CodecError, JsonCodec, PersistenceCodec};
    use crate::model::fixtures::class_diagram_small;
    use crate::model::DiagramGraph;

    #[test]
    fn encode_is_newline_terminated_and_decodes_back() {
        let graph = class_diagram_small();
        let bytes = encode_to_vec(&JsonCodec, &graph).unwrap();
        assert_eq!(bytes.last(), Some(&b'\n'));

        let decoded: DiagramGraph = JsonCodec.decode(&mut bytes.as_slice()).unwrap();
        assert_eq!(decoded, graph);
    }

    #[test]
    fn malformed_input_is_a_json_error() {
        let err = PersistenceCodec::<DiagramGraph>::decode(&JsonCodec, &mut &b"{\"kind\":"[..])
            .unwrap_err();
        assert!(matches!(err, CodecError::Json(_)), "got {err:?}");
    }

    #[test]
    fn empty_input_is_rejected() {
        let err =
            PersistenceCodec::<DiagramGraph>::decode(&JsonCodec, &mut &b""[..]).unwrap_err();
        assert!(matches!(err, CodecError::Json(_)), "got {err:?}");
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let err = PersistenceCodec::<DiagramGraph>::decode(
            &JsonCodec,
            &mut &br#"{"kind":"gantt"}"#[..],
        )
        .unwrap_err();
        assert!(err.to_string().starts_with("malformed document"), "{err}");
    }
}
