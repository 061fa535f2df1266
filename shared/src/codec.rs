//! Packet encoding, TCP framing and map payload compression.
//!
//! A TCP frame is a 2-byte big-endian payload length followed by the
//! bincode-encoded [`Packet`]. UDP datagrams carry the encoded packet as is.

use crate::{MapDimensions, Packet, MAX_FRAME_LEN};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::ErrorKind;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("frame of {0} bytes exceeds the 2-byte length prefix")]
    FrameTooLarge(usize),
    #[error("failed to encode packet: {0}")]
    Encode(bincode::Error),
    #[error("failed to decode packet: {0}")]
    Decode(bincode::Error),
    #[error("connection error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to decompress map payload: {0}")]
    Decompress(std::io::Error),
}

pub fn encode(packet: &Packet) -> Result<Vec<u8>, ProtocolError> {
    bincode::serialize(packet).map_err(ProtocolError::Encode)
}

pub fn decode(bytes: &[u8]) -> Result<Packet, ProtocolError> {
    bincode::deserialize(bytes).map_err(ProtocolError::Decode)
}

/// Encodes a packet with its length prefix.
pub fn encode_frame(packet: &Packet) -> Result<Vec<u8>, ProtocolError> {
    let body = encode(packet)?;
    if body.len() > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge(body.len()));
    }

    let mut frame = Vec::with_capacity(body.len() + 2);
    frame.extend_from_slice(&(body.len() as u16).to_be_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Reads one frame. Returns `Ok(None)` when the peer closed the stream
/// cleanly between frames.
///
/// A frame whose body fails to decode is fully consumed before the
/// `Decode` error is returned, so the caller may keep reading.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Packet>, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = [0u8; 2];
    match reader.read_exact(&mut prefix).await {
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u16::from_be_bytes(prefix) as usize;
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;

    decode(&body).map(Some)
}

pub async fn write_frame<W>(writer: &mut W, packet: &Packet) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode_frame(packet)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

pub fn compress_map(map: &MapDimensions) -> Result<Vec<u8>, ProtocolError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    bincode::serialize_into(&mut encoder, map).map_err(ProtocolError::Encode)?;
    encoder.finish().map_err(ProtocolError::Io)
}

pub fn decompress_map(bytes: &[u8]) -> Result<MapDimensions, ProtocolError> {
    let mut decoder = ZlibDecoder::new(bytes);
    bincode::deserialize_from(&mut decoder).map_err(|e| match *e {
        bincode::ErrorKind::Io(io) => ProtocolError::Decompress(io),
        other => ProtocolError::Decode(Box::new(other)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EntityPosition, Obstacle};

    #[test]
    fn test_frame_prefix_is_big_endian_length() {
        let packet = Packet::Connected { id: 7 };
        let body = encode(&packet).unwrap();
        let frame = encode_frame(&packet).unwrap();

        assert_eq!(frame.len(), body.len() + 2);
        assert_eq!(u16::from_be_bytes([frame[0], frame[1]]) as usize, body.len());
        assert_eq!(&frame[2..], &body[..]);
    }

    #[test]
    fn test_read_frames_in_sequence() {
        let mut stream = encode_frame(&Packet::Connected { id: 1 }).unwrap();
        stream.extend(encode_frame(&Packet::RoomChanged { id: 1, room: 4 }).unwrap());

        tokio_test::block_on(async {
            let mut reader = &stream[..];
            assert_eq!(
                read_frame(&mut reader).await.unwrap(),
                Some(Packet::Connected { id: 1 })
            );
            assert_eq!(
                read_frame(&mut reader).await.unwrap(),
                Some(Packet::RoomChanged { id: 1, room: 4 })
            );
            assert_eq!(read_frame(&mut reader).await.unwrap(), None);
        });
    }

    #[test]
    fn test_truncated_frame_is_io_error() {
        let frame = encode_frame(&Packet::Welcome {
            player_id: 2,
            seed: 99,
            connected_players: vec![1, 3],
        })
        .unwrap();
        let truncated = &frame[..frame.len() - 1];

        tokio_test::block_on(async {
            let mut reader = truncated;
            match read_frame(&mut reader).await {
                Err(ProtocolError::Io(e)) => assert_eq!(e.kind(), ErrorKind::UnexpectedEof),
                other => panic!("Expected io error, got {:?}", other),
            }
        });
    }

    #[test]
    fn test_undecodable_frame_is_skipped() {
        let mut stream = vec![0, 3, 0xff, 0xff, 0xff];
        stream.extend(encode_frame(&Packet::Disconnected { id: 5 }).unwrap());

        tokio_test::block_on(async {
            let mut reader = &stream[..];
            assert!(matches!(
                read_frame(&mut reader).await,
                Err(ProtocolError::Decode(_))
            ));
            assert_eq!(
                read_frame(&mut reader).await.unwrap(),
                Some(Packet::Disconnected { id: 5 })
            );
        });
    }

    #[test]
    fn test_oversized_frame_rejected() {
        let packet = Packet::MapDimensions {
            compressed: vec![0u8; MAX_FRAME_LEN + 1],
        };
        assert!(matches!(
            encode_frame(&packet),
            Err(ProtocolError::FrameTooLarge(_))
        ));
    }

    #[test]
    fn test_write_frame_matches_encode_frame() {
        let packet = Packet::MapUpdate {
            id: 1,
            players: vec![EntityPosition { id: 1, x: 10, y: 20 }],
            enemies: vec![],
        };

        let written = tokio_test::block_on(async {
            let mut out: Vec<u8> = Vec::new();
            write_frame(&mut out, &packet).await.unwrap();
            out
        });

        assert_eq!(written, encode_frame(&packet).unwrap());
    }

    #[test]
    fn test_map_compression() {
        let map = MapDimensions {
            obstacles: (0..200)
                .map(|i| Obstacle {
                    left: (i % 20) * 10,
                    top: (i / 20) * 10,
                })
                .collect(),
        };

        let compressed = compress_map(&map).unwrap();
        assert!(compressed.len() < bincode::serialize(&map).unwrap().len());
        assert_eq!(decompress_map(&compressed).unwrap(), map);
    }

    #[test]
    fn test_decompress_garbage_fails() {
        assert!(decompress_map(&[1, 2, 3, 4, 5]).is_err());
    }
}
