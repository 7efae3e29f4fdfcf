//! The receiver task (§4.4): owns the transport's read half and the
//! streaming decoder, and multiplexes decoded server messages onto two
//! outbound queues — `dataQ` for accumulated row batches, `allQ` for
//! everything the request API needs to correlate barriers and
//! describe-results.
use tokio::io::AsyncRead;
use tokio::sync::mpsc;

use crate::common::trace;
use crate::decode::Decoder;
use crate::error::Error;
use crate::postgres::backend::{DataRow, ErrorResponse, ServerMessage};
use crate::postgres::fields;

/// One `Execute`'s rows, in receipt order.
#[derive(Debug, Default)]
pub struct DataMessage {
    pub rows: Vec<DataRow>,
}

impl IntoIterator for DataMessage {
    type Item = DataRow;
    type IntoIter = std::vec::IntoIter<DataRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

pub type DataQueueItem = Result<DataMessage, Error>;
pub type AllQueueItem = Result<ServerMessage, Error>;

pub type DataReceiver = mpsc::UnboundedReceiver<DataQueueItem>;
pub type AllReceiver = mpsc::UnboundedReceiver<AllQueueItem>;

/// Messages admitted onto `allQ`: everything the request API needs to
/// correlate `Sync`/`ReadyForQuery` barriers and describe-results, plus
/// `NegotiateProtocolVersion` (surfaced, not acted on — see `SPEC_FULL.md`
/// §1.2).
fn admitted_to_all_queue(msg: &ServerMessage) -> bool {
    matches!(
        msg,
        ServerMessage::NegotiateProtocolVersion(_)
            | ServerMessage::NoData(_)
            | ServerMessage::ParameterDescription(_)
            | ServerMessage::ReadyForQuery(_)
            | ServerMessage::RowDescription(_)
    )
}

/// Runs until the transport errors or yields a malformed frame, at which
/// point the same [`Error`] is delivered to both queues and the task exits;
/// both senders are dropped, so a subsequent queue read observes closure
/// (see `Connection::close` in `connection.rs` for the matching comment).
pub(crate) async fn run<T: AsyncRead + Unpin>(
    mut reader: T,
    mut decoder: Decoder,
    data_tx: mpsc::UnboundedSender<DataQueueItem>,
    all_tx: mpsc::UnboundedSender<AllQueueItem>,
) {
    let mut accumulator: Vec<DataRow> = Vec::new();

    loop {
        let (msgtype, body) = match decoder.read_frame(&mut reader).await {
            Ok(frame) => frame,
            Err(err) => return fatal(&data_tx, &all_tx, err),
        };

        let message = match ServerMessage::decode(msgtype, body) {
            Ok(message) => message,
            Err(decode_err) => return fatal(&data_tx, &all_tx, Error::from(decode_err)),
        };

        trace!("(B) {:?}", message);

        match message {
            ServerMessage::DataRow(row) => accumulator.push(row),

            ServerMessage::CommandComplete(_) | ServerMessage::EmptyQueryResponse(_) => {
                let batch = DataMessage { rows: std::mem::take(&mut accumulator) };
                let _ = data_tx.send(Ok(batch));
            }

            ServerMessage::ErrorResponse(ErrorResponse { body }) => {
                accumulator.clear();
                match fields::parse(body.clone()) {
                    Ok(desc) => {
                        let _ = data_tx.send(Err(Error::PostgresError(desc)));
                    }
                    Err(decode_err) => {
                        let _ = data_tx.send(Err(Error::from(decode_err)));
                    }
                }
                let _ = all_tx.send(Ok(ServerMessage::ErrorResponse(ErrorResponse { body })));
            }

            ServerMessage::NoticeResponse(notice) => {
                #[cfg(feature = "log")]
                if let Ok(desc) = fields::parse(notice.body) {
                    log::warn!("{desc}");
                }
                #[cfg(not(feature = "log"))]
                let _ = notice;
            }

            ServerMessage::NotificationResponse(_) | ServerMessage::PortalSuspended(_) => {}

            other => {
                if admitted_to_all_queue(&other) {
                    let _ = all_tx.send(Ok(other));
                }
            }
        }
    }
}

fn fatal(
    data_tx: &mpsc::UnboundedSender<DataQueueItem>,
    all_tx: &mpsc::UnboundedSender<AllQueueItem>,
    err: Error,
) {
    let _ = data_tx.send(Err(err.clone()));
    let _ = all_tx.send(Err(err));
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    fn frame(msgtype: u8, body: &[u8]) -> Vec<u8> {
        let mut out = vec![msgtype];
        out.extend_from_slice(&((4 + body.len()) as u32).to_be_bytes());
        out.extend_from_slice(body);
        out
    }

    fn data_row(cols: &[&[u8]]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&(cols.len() as i16).to_be_bytes());
        for col in cols {
            body.extend_from_slice(&(col.len() as i32).to_be_bytes());
            body.extend_from_slice(col);
        }
        frame(b'D', &body)
    }

    fn error_response(code: &str, message: &str) -> Vec<u8> {
        let mut body = Vec::new();
        body.push(b'S');
        body.extend_from_slice(b"ERROR\0");
        body.push(b'C');
        body.extend_from_slice(code.as_bytes());
        body.push(0);
        body.push(b'M');
        body.extend_from_slice(message.as_bytes());
        body.push(0);
        body.push(0);
        frame(b'E', &body)
    }

    fn ready_for_query(status: u8) -> Vec<u8> {
        frame(b'Z', &[status])
    }

    /// Spawn `receiver::run` over a `tokio::io::duplex`, write `script` to
    /// the peer half, and return the two queue receivers.
    async fn harness(script: &[u8]) -> (DataReceiver, AllReceiver, tokio::task::JoinHandle<()>) {
        let (mut client, server) = tokio::io::duplex(4096);
        let (data_tx, data_rx) = mpsc::unbounded_channel();
        let (all_tx, all_rx) = mpsc::unbounded_channel();
        let handle = tokio::task::spawn(run(server, Decoder::new(), data_tx, all_tx));
        client.write_all(script).await.unwrap();
        (data_rx, all_rx, handle)
    }

    #[tokio::test]
    async fn command_complete_flushes_accumulated_rows() {
        let mut script = Vec::new();
        script.extend(data_row(&[b"1"]));
        script.extend(data_row(&[b"2"]));
        script.extend(frame(b'C', b"SELECT 2\0"));
        let (mut data_rx, _all_rx, _handle) = harness(&script).await;

        let batch = data_rx.recv().await.unwrap().unwrap();
        assert_eq!(batch.rows.len(), 2);
    }

    #[tokio::test]
    async fn empty_query_response_flushes_an_empty_batch() {
        let script = frame(b'I', b"");
        let (mut data_rx, _all_rx, _handle) = harness(&script).await;

        let batch = data_rx.recv().await.unwrap().unwrap();
        assert!(batch.rows.is_empty());
    }

    #[tokio::test]
    async fn error_response_is_delivered_to_both_queues_and_clears_the_accumulator() {
        let mut script = Vec::new();
        script.extend(data_row(&[b"1"]));
        script.extend(error_response("22001", "boom"));
        script.extend(frame(b'C', b"SELECT 1\0"));
        let (mut data_rx, mut all_rx, _handle) = harness(&script).await;

        let first = data_rx.recv().await.unwrap();
        assert!(matches!(first, Err(Error::PostgresError(_))));

        let on_all = all_rx.recv().await.unwrap().unwrap();
        assert!(matches!(on_all, ServerMessage::ErrorResponse(_)));

        // the accumulator was cleared by the error, so the later
        // CommandComplete flushes an empty batch, not the row above.
        let second = data_rx.recv().await.unwrap().unwrap();
        assert!(second.rows.is_empty());
    }

    #[tokio::test]
    async fn notification_and_portal_suspended_are_not_forwarded() {
        let mut script = Vec::new();
        script.extend(frame(b'A', b"\0\0\0\x01chan\0payload\0"));
        script.extend(frame(b's', b""));
        script.extend(ready_for_query(b'I'));
        let (_data_rx, mut all_rx, _handle) = harness(&script).await;

        let only = all_rx.recv().await.unwrap().unwrap();
        assert!(matches!(only, ServerMessage::ReadyForQuery(_)));
    }

    #[tokio::test]
    async fn ready_for_query_and_row_description_are_admitted_to_all_queue() {
        let mut script = Vec::new();
        script.extend(frame(b't', b"\0\x00"));
        script.extend(ready_for_query(b'I'));
        let (_data_rx, mut all_rx, _handle) = harness(&script).await;

        let first = all_rx.recv().await.unwrap().unwrap();
        assert!(matches!(first, ServerMessage::ParameterDescription(_)));
        let second = all_rx.recv().await.unwrap().unwrap();
        assert!(matches!(second, ServerMessage::ReadyForQuery(_)));
    }

    #[tokio::test]
    async fn malformed_frame_delivers_one_fatal_error_to_both_queues() {
        // tag 'Z' (ReadyForQuery) with an invalid transaction-status byte.
        let script = frame(b'Z', b"X");
        let (mut data_rx, mut all_rx, handle) = harness(&script).await;

        assert!(matches!(data_rx.recv().await.unwrap(), Err(Error::DecodeError(_))));
        assert!(matches!(all_rx.recv().await.unwrap(), Err(Error::DecodeError(_))));
        assert!(data_rx.recv().await.is_none());
        assert!(all_rx.recv().await.is_none());
        handle.await.unwrap();
    }
}
