//! The request API (§4.5): the high-level client surface built on top of
//! [`Connection`]'s send/flush and its two outbound queues.
use crate::connection::Connection;
use crate::error::Error;
use crate::postgres::backend::ServerMessage;
use crate::postgres::frontend::{Bind, BindParam, Describe, Execute, Flush, Parse, Sync, Target};
use crate::postgres::{Oid, PgFormat};
use crate::receiver::{AllReceiver, DataMessage};

/// One query in a [`send_batch`] call: `Parse` + `Bind` + `Execute`, always
/// against the unnamed statement and portal (the driver never caches a
/// prepared statement across a batch; see `statement::StatementStorage`
/// for the opaque caching handle this leaves to the caller).
pub struct QuerySpec<'a> {
    pub sql: &'a str,
    pub oids: &'a [Oid],
    pub params: &'a [BindParam<'a>],
    pub param_format: PgFormat,
    pub result_format: PgFormat,
}

/// The result of a successful [`describe_statement`] call.
pub struct Described {
    pub param_oids: Vec<Oid>,
    pub fields: Vec<crate::postgres::backend::FieldDescription>,
}

/// For each query, emit `Parse("", sql, oids)`, `Bind("", "", ...)`,
/// `Execute("", 0)`. No `Sync` is emitted; call [`send_sync`] or
/// [`send_batch_and_sync`] to close out the round.
pub async fn send_batch(conn: &mut Connection, queries: &[QuerySpec<'_>]) -> Result<(), Error> {
    for query in queries {
        conn.send(Parse { stmt_name: "", sql: query.sql, oids: query.oids.iter().copied() });
        conn.send(Bind {
            portal_name: "",
            stmt_name: "",
            param_format: query.param_format,
            params: query.params.iter().copied(),
            result_format: query.result_format,
        });
        conn.send(Execute { portal_name: "", max_rows: 0 });
    }
    conn.flush().await
}

pub async fn send_sync(conn: &mut Connection) -> Result<(), Error> {
    conn.send(Sync);
    conn.flush().await
}

pub async fn send_flush(conn: &mut Connection) -> Result<(), Error> {
    conn.send(Flush);
    conn.flush().await
}

/// Convenience for [`send_batch`] followed by [`send_sync`], flushed once.
pub async fn send_batch_and_sync(conn: &mut Connection, queries: &[QuerySpec<'_>]) -> Result<(), Error> {
    for query in queries {
        conn.send(Parse { stmt_name: "", sql: query.sql, oids: query.oids.iter().copied() });
        conn.send(Bind {
            portal_name: "",
            stmt_name: "",
            param_format: query.param_format,
            params: query.params.iter().copied(),
            result_format: query.result_format,
        });
        conn.send(Execute { portal_name: "", max_rows: 0 });
    }
    conn.send(Sync);
    conn.flush().await
}

/// Dequeue the next entry from `dataQ`, blocking until one arrives.
pub async fn read_next_data(conn: &mut Connection) -> Result<DataMessage, Error> {
    conn.data_queue().recv().await.ok_or(Error::ConnectionClosed)?
}

/// Drain `allQ` until `ReadyForQuery` is observed. Returns the first error
/// seen in the drained prefix, if any; otherwise `Ok(())`.
pub async fn read_ready_for_query(conn: &mut Connection) -> Result<(), Error> {
    drain_until_ready(conn.all_queue()).await
}

async fn drain_until_ready(rx: &mut AllReceiver) -> Result<(), Error> {
    let mut first_error: Option<Error> = None;

    loop {
        let item = rx.recv().await.ok_or(Error::ConnectionClosed)?;
        match item {
            Ok(ServerMessage::ReadyForQuery(_)) => break,
            Ok(_) => {}
            Err(err) => {
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// `Parse("", sql, [])`, `DescribeStatement("")`, `Sync`; collect until
/// `ReadyForQuery`; expect either `[ParameterDescription, NoData]` or
/// `[ParameterDescription, RowDescription]`.
pub async fn describe_statement(conn: &mut Connection, sql: &str) -> Result<Described, Error> {
    conn.send(Parse { stmt_name: "", sql, oids: std::iter::empty::<Oid>() });
    conn.send(Describe { target: Target::Statement, name: "" });
    conn.send(Sync);
    conn.flush().await?;

    collect_describe(conn.all_queue()).await
}

async fn collect_describe(rx: &mut AllReceiver) -> Result<Described, Error> {
    let mut param_oids = None;
    let mut fields = None;
    let mut first_error: Option<Error> = None;

    loop {
        let item = rx.recv().await.ok_or(Error::ConnectionClosed)?;
        match item {
            Ok(ServerMessage::ParameterDescription(desc)) => param_oids = Some(desc.oids),
            Ok(ServerMessage::NoData(_)) => fields = Some(Vec::new()),
            Ok(ServerMessage::RowDescription(desc)) => fields = Some(desc.fields),
            Ok(ServerMessage::ReadyForQuery(_)) => break,
            Ok(_) => {}
            Err(err) => {
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }
    }

    if let Some(err) = first_error {
        return Err(err);
    }

    Ok(Described {
        param_oids: param_oids.unwrap_or_default(),
        fields: fields.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::postgres::backend::{NoData, ParameterDescription, ReadyForQuery, TransactionStatus};
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn drain_until_ready_reports_no_error_on_clean_prefix() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(Ok(ServerMessage::ParameterDescription(ParameterDescription { oids: vec![] }))).unwrap();
        tx.send(Ok(ServerMessage::ReadyForQuery(ReadyForQuery { tx_status: TransactionStatus::Idle }))).unwrap();
        drop(tx);

        assert!(drain_until_ready(&mut rx).await.is_ok());
    }

    #[tokio::test]
    async fn drain_until_ready_surfaces_first_error() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let desc = crate::postgres::fields::parse(bytes::Bytes::from_static(b"S\0ERROR\0C\x0022001\0M\0oops\0\0")).unwrap();
        tx.send(Err(Error::PostgresError(desc))).unwrap();
        tx.send(Ok(ServerMessage::ReadyForQuery(ReadyForQuery { tx_status: TransactionStatus::Failed }))).unwrap();
        drop(tx);

        assert!(matches!(drain_until_ready(&mut rx).await, Err(Error::PostgresError(_))));
    }

    #[tokio::test]
    async fn collect_describe_with_no_result_set() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(Ok(ServerMessage::ParameterDescription(ParameterDescription { oids: vec![] }))).unwrap();
        tx.send(Ok(ServerMessage::NoData(NoData))).unwrap();
        tx.send(Ok(ServerMessage::ReadyForQuery(ReadyForQuery { tx_status: TransactionStatus::Idle }))).unwrap();
        drop(tx);

        let described = collect_describe(&mut rx).await.unwrap();
        assert!(described.param_oids.is_empty());
        assert!(described.fields.is_empty());
    }

    #[tokio::test]
    async fn collect_describe_with_row_description() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(Ok(ServerMessage::ParameterDescription(ParameterDescription { oids: vec![23, 23] }))).unwrap();
        tx.send(Ok(ServerMessage::RowDescription(crate::postgres::backend::RowDescription {
            fields: vec![],
        })))
        .unwrap();
        tx.send(Ok(ServerMessage::ReadyForQuery(ReadyForQuery { tx_status: TransactionStatus::Idle }))).unwrap();
        drop(tx);

        let described = collect_describe(&mut rx).await.unwrap();
        assert_eq!(described.param_oids, vec![23, 23]);
        assert!(described.fields.is_empty());
    }

    #[tokio::test]
    async fn all_queue_closed_before_ready_is_connection_closed() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        drop(tx);
        assert!(matches!(drain_until_ready(&mut rx).await, Err(Error::ConnectionClosed)));
    }
}
