use anyhow::Result;
use bytes::Bytes;
use clap::{Parser, Subcommand};
use futures::SinkExt;
use tokio::io::AsyncWrite;
use tokio_util::codec::FramedWrite;
use tracing::info;

use mysql_wire::config::AppConfig;
use mysql_wire::protocol::column::{ColumnDefinition, MYSQL_TYPE_VAR_STRING};
use mysql_wire::protocol::err::ErrorInfo;
use mysql_wire::protocol::message::{generate_com_query_packet, generate_error_info, generate_ok, OkPacket};
use mysql_wire::protocol::resultset::{ResultSetWriter, RowFormat};
use mysql_wire::protocol::{CodecContext, OutboundPacket, PacketEncoder};
use mysql_wire::span_codec;
use mysql_wire::telemetry;

#[derive(Parser, Debug)]
#[command(author, version, about = "Encode MySQL protocol packets", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(long)]
    config: Option<String>,

    /// Write the framed bytes to stdout instead of a hex dump
    #[arg(long)]
    raw: bool,

    /// Sequence id of the first response packet
    #[arg(long, default_value_t = 1)]
    sequence_id: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// COM_QUERY command, as the proxy sends it to a backend
    Query { sql: String },
    /// OK response
    Ok {
        #[arg(long, default_value_t = 0)]
        affected_rows: u64,
        #[arg(long, default_value_t = 0)]
        last_insert_id: u64,
        #[arg(long)]
        info: Option<String>,
    },
    /// ERR response
    Error {
        #[arg(long, default_value_t = 1105)]
        code: u16,
        #[arg(long, default_value = "HY000")]
        sql_state: String,
        message: String,
    },
    /// Result set of VARCHAR columns
    ResultSet {
        #[arg(long, value_delimiter = ',', required = true)]
        columns: Vec<String>,
        /// Comma separated values; NULL marks a null field
        #[arg(long = "row")]
        rows: Vec<String>,
        /// Use the binary row protocol
        #[arg(long)]
        binary: bool,
    },
}

/// What ends up on the sink: a finished buffer, or a payload still to be framed.
enum Outbound {
    Framed(Bytes),
    Payload(OutboundPacket),
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    telemetry::init_logging(&config.logging)?;

    let outbound = build(&args, &config)?;
    let encoder = PacketEncoder::new(&config.codec);

    if args.raw {
        emit(tokio::io::stdout(), encoder, outbound).await?;
    } else {
        let buf = emit(Vec::new(), encoder, outbound).await?;
        info!(bytes = buf.len(), "Encoded packet");
        println!("{}", hex_dump(&buf));
    }
    Ok(())
}

fn build(args: &Args, config: &AppConfig) -> Result<Outbound> {
    let codec = &config.codec;
    let mut ctx = CodecContext::new(codec);
    let _span = span_codec!("build", command = ?args.command).entered();

    let outbound = match &args.command {
        Command::Query { sql } => Outbound::Framed(generate_com_query_packet(&mut ctx, sql)?),
        Command::Ok {
            affected_rows,
            last_insert_id,
            info,
        } => {
            let mut ok = OkPacket::new(*affected_rows, *last_insert_id, codec.server_status);
            if let Some(info) = info {
                ok = ok.with_info(info.clone());
            }
            let payload = generate_ok(&ok, codec.capabilities)?;
            Outbound::Payload(OutboundPacket::new(args.sequence_id, payload))
        }
        Command::Error {
            code,
            sql_state,
            message,
        } => {
            let sql_state: [u8; 5] = sql_state
                .as_bytes()
                .try_into()
                .map_err(|_| anyhow::anyhow!("SQL state must be 5 bytes: {sql_state:?}"))?;
            let e = ErrorInfo::new(*code, message.clone()).with_sql_state(sql_state);
            let payload = generate_error_info(&e, codec.capabilities)?;
            Outbound::Payload(OutboundPacket::new(args.sequence_id, payload))
        }
        Command::ResultSet {
            columns,
            rows,
            binary,
        } => {
            let charset = codec.charset()?;
            let columns = columns
                .iter()
                .map(|name| {
                    ColumnDefinition::new(
                        name,
                        name,
                        MYSQL_TYPE_VAR_STRING,
                        charset.collation_index(),
                        charset,
                    )
                })
                .collect::<mysql_wire::Result<Vec<_>>>()?;
            let format = if *binary { RowFormat::Binary } else { RowFormat::Text };
            let mut rs = ResultSetWriter::new(columns, format).with_status(codec.server_status, 0);
            for row in rows {
                let fields = row
                    .split(',')
                    .map(|v| match v {
                        "NULL" => Ok(None),
                        v => charset.encode(v).map(|b| Some(Bytes::copy_from_slice(&b))),
                    })
                    .collect::<mysql_wire::Result<Vec<_>>>()?;
                rs.push_row(fields)?;
            }
            let (buf, _) = rs.encode(&mut ctx, args.sequence_id, codec.capabilities)?;
            Outbound::Framed(buf)
        }
    };
    Ok(outbound)
}

async fn emit<W: AsyncWrite + Unpin>(writer: W, encoder: PacketEncoder, outbound: Outbound) -> Result<W> {
    let mut sink = FramedWrite::new(writer, encoder);
    match outbound {
        Outbound::Framed(buf) => sink.send(buf).await?,
        Outbound::Payload(packet) => sink.send(packet).await?,
    }
    Ok(sink.into_inner())
}

fn hex_dump(buf: &[u8]) -> String {
    buf.chunks(16)
        .enumerate()
        .map(|(i, row)| format!("{:08x}  {}", i * 16, hex::encode(row)))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_dump_rows() {
        let buf: Vec<u8> = (0u8..18).collect();
        assert_eq!(
            hex_dump(&buf),
            "00000000  000102030405060708090a0b0c0d0e0f\n00000010  1011"
        );
    }
}
