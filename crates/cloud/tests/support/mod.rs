//! Minimal in-process HTTP/1.1 server for exercising the clients offline,
//! plus a synthetic tiled GeoTIFF to serve from it.

#![allow(dead_code)]

use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub struct Request {
    pub method: String,
    /// Path plus query string.
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Request {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap_or(serde_json::Value::Null)
    }
}

pub struct Reply {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Reply {
    pub fn json(value: serde_json::Value) -> Self {
        Self {
            status: 200,
            headers: vec![("Content-Type".into(), "application/json".into())],
            body: value.to_string().into_bytes(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }
}

/// Serve `file` honoring single `Range: bytes=a-b` headers.
pub fn range_reply(file: &[u8], req: &Request) -> Reply {
    let range = req
        .header("range")
        .and_then(|r| r.strip_prefix("bytes="))
        .and_then(|r| r.split_once('-'))
        .and_then(|(a, b)| Some((a.parse::<usize>().ok()?, b.parse::<usize>().ok()?)));

    match range {
        Some((start, _)) if start >= file.len() => Reply::status(416),
        Some((start, end)) => {
            let end = end.min(file.len() - 1);
            Reply {
                status: 206,
                headers: vec![(
                    "Content-Range".into(),
                    format!("bytes {start}-{end}/{}", file.len()),
                )],
                body: file[start..=end].to_vec(),
            }
        }
        None => Reply {
            status: 200,
            headers: vec![("Accept-Ranges".into(), "bytes".into())],
            body: file.to_vec(),
        },
    }
}

/// Start a server on an ephemeral port; returns its base URL.
pub async fn spawn<F>(handler: F) -> String
where
    F: Fn(&Request) -> Reply + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handler = Arc::new(handler);
    tokio::spawn(async move {
        while let Ok((sock, _)) = listener.accept().await {
            let handler = Arc::clone(&handler);
            tokio::spawn(async move {
                let _ = serve(sock, handler.as_ref()).await;
            });
        }
    });
    format!("http://{addr}")
}

async fn serve<F>(mut sock: TcpStream, handler: &F) -> std::io::Result<()>
where
    F: Fn(&Request) -> Reply,
{
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = sock.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut lines = head.lines();
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let target = request_line.next().unwrap_or_default().to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = buf[header_end..].to_vec();
    while body.len() < content_length {
        let n = sock.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    let req = Request {
        method,
        target,
        headers,
        body,
    };
    let reply = handler(&req);

    let mut out = format!(
        "HTTP/1.1 {} X\r\nContent-Length: {}\r\nConnection: close\r\n",
        reply.status,
        reply.body.len()
    );
    for (k, v) in &reply.headers {
        out.push_str(&format!("{k}: {v}\r\n"));
    }
    out.push_str("\r\n");
    sock.write_all(out.as_bytes()).await?;
    if req.method != "HEAD" {
        sock.write_all(&reply.body).await?;
    }
    sock.shutdown().await
}

/// 8x8 u16 COG in EPSG:32630 with 30 m pixels, 4x4 DEFLATE tiles.
pub mod cog {
    use std::io::Write;

    pub const SIZE: usize = 8;
    pub const TILE: usize = 4;
    pub const PIXEL: f64 = 30.0;
    pub const ORIGIN_X: f64 = 440_000.0;
    pub const ORIGIN_Y: f64 = 4_474_020.0;

    pub fn pixel(row: usize, col: usize) -> u16 {
        if row == 0 && col == 0 {
            0
        } else {
            1000 + 10 * row as u16 + col as u16
        }
    }

    struct Tag {
        id: u16,
        field_type: u16,
        count: u32,
        bytes: Vec<u8>,
    }

    fn short(id: u16, v: u16) -> Tag {
        Tag { id, field_type: 3, count: 1, bytes: v.to_le_bytes().to_vec() }
    }

    fn shorts(id: u16, v: &[u16]) -> Tag {
        Tag {
            id,
            field_type: 3,
            count: v.len() as u32,
            bytes: v.iter().flat_map(|x| x.to_le_bytes()).collect(),
        }
    }

    fn longs(id: u16, v: &[u32]) -> Tag {
        Tag {
            id,
            field_type: 4,
            count: v.len() as u32,
            bytes: v.iter().flat_map(|x| x.to_le_bytes()).collect(),
        }
    }

    fn doubles(id: u16, v: &[f64]) -> Tag {
        Tag {
            id,
            field_type: 12,
            count: v.len() as u32,
            bytes: v.iter().flat_map(|x| x.to_le_bytes()).collect(),
        }
    }

    /// One zlib-compressed tile with horizontal differencing applied.
    fn encode_tile(tile_row: usize, tile_col: usize) -> Vec<u8> {
        let mut raw = Vec::with_capacity(TILE * TILE * 2);
        for r in 0..TILE {
            let mut prev = 0u16;
            for c in 0..TILE {
                let v = pixel(tile_row * TILE + r, tile_col * TILE + c);
                let diff = if c == 0 { v } else { v.wrapping_sub(prev) };
                raw.extend_from_slice(&diff.to_le_bytes());
                prev = v;
            }
        }
        let mut enc = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        enc.write_all(&raw).unwrap();
        enc.finish().unwrap()
    }

    /// 8x8 little-endian u16 GeoTIFF in EPSG:32630, 4x4 DEFLATE tiles, predictor 2.
    pub fn synthetic_cog() -> Vec<u8> {
        let tiles: Vec<Vec<u8>> = (0..SIZE / TILE)
            .flat_map(|tr| (0..SIZE / TILE).map(move |tc| encode_tile(tr, tc)))
            .collect();
        let counts: Vec<u32> = tiles.iter().map(|t| t.len() as u32).collect();

        let mut tags = vec![
            short(256, SIZE as u16),
            short(257, SIZE as u16),
            short(258, 16),
            short(259, 8),
            short(277, 1),
            short(284, 1),
            short(317, 2),
            short(322, TILE as u16),
            short(323, TILE as u16),
            longs(324, &vec![0; tiles.len()]),
            longs(325, &counts),
            short(339, 1),
            doubles(33550, &[PIXEL, PIXEL, 0.0]),
            doubles(33922, &[0.0, 0.0, 0.0, ORIGIN_X, ORIGIN_Y, 0.0]),
            shorts(34735, &[1, 1, 0, 1, 3072, 0, 1, 32630]),
            Tag { id: 42113, field_type: 2, count: 2, bytes: b"0\0".to_vec() },
        ];

        let ifd_len = 2 + 12 * tags.len() + 4;
        let extra: usize = tags.iter().filter(|t| t.bytes.len() > 4).map(|t| t.bytes.len()).sum();
        let mut next = (8 + ifd_len + extra) as u32;
        let offsets: Vec<u32> = tiles
            .iter()
            .map(|t| {
                let o = next;
                next += t.len() as u32;
                o
            })
            .collect();
        tags[9] = longs(324, &offsets);

        let mut out = Vec::new();
        out.extend_from_slice(b"II");
        out.extend_from_slice(&42u16.to_le_bytes());
        out.extend_from_slice(&8u32.to_le_bytes());
        out.extend_from_slice(&(tags.len() as u16).to_le_bytes());

        let mut data_cursor = (8 + ifd_len) as u32;
        let mut extra_bytes = Vec::new();
        for tag in &tags {
            out.extend_from_slice(&tag.id.to_le_bytes());
            out.extend_from_slice(&tag.field_type.to_le_bytes());
            out.extend_from_slice(&tag.count.to_le_bytes());
            if tag.bytes.len() <= 4 {
                let mut field = [0u8; 4];
                field[..tag.bytes.len()].copy_from_slice(&tag.bytes);
                out.extend_from_slice(&field);
            } else {
                out.extend_from_slice(&data_cursor.to_le_bytes());
                data_cursor += tag.bytes.len() as u32;
                extra_bytes.extend_from_slice(&tag.bytes);
            }
        }
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&extra_bytes);
        for tile in &tiles {
            out.extend_from_slice(tile);
        }
        out
    }
}
