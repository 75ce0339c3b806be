//! Stdio decision service
//!
//! Reads one JSON evaluation input per line and answers each with one JSON
//! line: the decision together with the request as the evaluator left it
//! (flags turned off, directive headers attached), or an error.
//!
//! ```json
//! {"user":{"name":"worf"},"action":"indices:data/read/search","request":{"body":{"type":"search","indices":["starfleet"]},"context":{"remote_address":{"address":"10.0.0.1"}}}}
//! ```

use crate::error::TransportError;
use crate::evaluator::decision::Decision;
use crate::evaluator::privileges::PrivilegesEvaluator;
use crate::evaluator::request::{Request, User};
use crate::evaluator::topology::ClusterTopology;
use serde::{Deserialize, Serialize};
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tracing::{debug, info, warn};

/// One evaluation asked for over the wire
#[derive(Debug, Clone, Deserialize)]
pub struct EvaluationInput {
    pub user: User,
    pub action: String,
    pub request: Request,
}

/// Answer to one input line
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum EvaluationOutput {
    Decision { decision: Decision, request: Request },
    Error { error: String },
}

impl EvaluationOutput {
    fn error(err: impl ToString) -> Self {
        EvaluationOutput::Error {
            error: err.to_string(),
        }
    }
}

/// Evaluate a single input line
pub fn handle_line(
    evaluator: &PrivilegesEvaluator,
    topology: &dyn ClusterTopology,
    line: &str,
) -> EvaluationOutput {
    let input: EvaluationInput = match serde_json::from_str(line) {
        Ok(input) => input,
        Err(e) => {
            warn!(error = %e, "Malformed evaluation input");
            return EvaluationOutput::error(TransportError::InvalidMessage(e.to_string()));
        }
    };

    let EvaluationInput {
        user,
        action,
        mut request,
    } = input;

    match evaluator.evaluate(&user, &action, &mut request, topology) {
        Ok(decision) => {
            debug!(user = user.name.as_str(), action = action.as_str(), allowed = decision.allowed, "Evaluated");
            EvaluationOutput::Decision { decision, request }
        }
        Err(e) => {
            warn!(user = user.name.as_str(), action = action.as_str(), error = %e, "Evaluation failed");
            EvaluationOutput::error(e)
        }
    }
}

/// Longest input line accepted; longer lines are answered with an error
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

enum Line {
    Text(String),
    Rejected(TransportError),
}

/// Read one line of at most `limit` bytes. An overlong line is consumed up to
/// its newline and reported as rejected.
async fn read_line<R>(
    reader: &mut R,
    buf: &mut Vec<u8>,
    limit: usize,
) -> Result<Option<Line>, TransportError>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    let read = (&mut *reader)
        .take(limit as u64 + 1)
        .read_until(b'\n', buf)
        .await?;
    if read == 0 {
        return Ok(None);
    }

    if buf.len() > limit && buf.last() != Some(&b'\n') {
        loop {
            let (consumed, done) = {
                let chunk = reader.fill_buf().await?;
                if chunk.is_empty() {
                    (0, true)
                } else if let Some(pos) = chunk.iter().position(|b| *b == b'\n') {
                    (pos + 1, true)
                } else {
                    (chunk.len(), false)
                }
            };
            reader.consume(consumed);
            if done {
                break;
            }
        }
        return Ok(Some(Line::Rejected(TransportError::LineTooLong { limit })));
    }

    while matches!(buf.last(), Some(b'\n' | b'\r')) {
        buf.pop();
    }
    Ok(Some(match String::from_utf8(std::mem::take(buf)) {
        Ok(text) => Line::Text(text),
        Err(e) => Line::Rejected(TransportError::InvalidMessage(e.to_string())),
    }))
}

/// Serve decisions from `reader` to `writer` until the input ends
pub async fn serve<R, W>(
    evaluator: &PrivilegesEvaluator,
    topology: &dyn ClusterTopology,
    reader: R,
    writer: W,
) -> Result<u64, TransportError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    serve_with_limit(evaluator, topology, reader, writer, MAX_LINE_BYTES).await
}

/// [`serve`] with a custom input line limit
pub async fn serve_with_limit<R, W>(
    evaluator: &PrivilegesEvaluator,
    topology: &dyn ClusterTopology,
    mut reader: R,
    mut writer: W,
    max_line_bytes: usize,
) -> Result<u64, TransportError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::new();
    let mut handled = 0u64;

    while let Some(line) = read_line(&mut reader, &mut buf, max_line_bytes).await? {
        let output = match line {
            Line::Text(text) if text.trim().is_empty() => continue,
            Line::Text(text) => handle_line(evaluator, topology, &text),
            Line::Rejected(e) => {
                warn!(error = %e, "Rejected input line");
                EvaluationOutput::error(e)
            }
        };
        let mut encoded = serde_json::to_vec(&output)?;
        encoded.push(b'\n');
        writer.write_all(&encoded).await?;
        writer.flush().await?;
        handled += 1;
    }

    Ok(handled)
}

/// Serve decisions over the process's stdin and stdout
pub async fn run_stdio(
    evaluator: &PrivilegesEvaluator,
    topology: &dyn ClusterTopology,
) -> Result<(), TransportError> {
    info!("Serving decisions over stdio");

    let handled = serve(
        evaluator,
        topology,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await?;

    info!(handled, "Input closed, stopping");
    Ok(())
}
