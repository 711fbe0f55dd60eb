use std::io::{self, Write};

use pngcodec::{
    ConfigurationError, Decoder, DecodingError, Encoder, EncodingError, UnsupportedFormat,
};
use rand::Rng;

fn random_pixels(len: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..len).map(|_| rng.gen()).collect()
}

fn decode(png: &[u8]) -> Result<Vec<u8>, DecodingError> {
    Decoder::new(png).read_info()?.read_image()
}

#[test]
fn random_rgb_images() {
    let mut rng = rand::thread_rng();
    for _ in 0..20 {
        let width = rng.gen_range(1..70);
        let height = rng.gen_range(1..70);
        let pixels = random_pixels((width * height * 3) as usize);

        let mut encoder = Encoder::new(width, height);
        encoder
            .set_compression_level(rng.gen_range(1..=9))
            .set_chunk_limit(rng.gen_range(0..4096));
        let mut png = Vec::new();
        encoder.build().unwrap().write_image(&mut png, &pixels).unwrap();

        assert_eq!(decode(&png).unwrap(), pixels, "{}x{}", width, height);
    }
}

#[test]
fn streamed_rows() {
    let (width, height) = (33, 21);
    let pixels = random_pixels(width * height * 3);
    let writer = Encoder::new(width as u32, height as u32).build().unwrap();

    let mut png = Vec::new();
    writer
        .write_rows(&mut png, pixels.chunks(width * 3).map(|row| row.to_vec()))
        .unwrap();
    assert_eq!(decode(&png).unwrap(), pixels);
}

#[test]
fn one_writer_many_images() {
    let writer = Encoder::new(5, 4).build().unwrap();
    for _ in 0..3 {
        let pixels = random_pixels(writer.image_len());
        let mut png = Vec::new();
        writer.write_image(&mut png, &pixels).unwrap();
        assert_eq!(decode(&png).unwrap(), pixels);
    }
}

#[test]
fn corrupted_payload_fails_checksum() {
    let mut png = Vec::new();
    pngcodec::encode(&mut png, 6, 6, &random_pixels(108)).unwrap();

    // Skip signature, then for every chunk flip each payload byte.
    let mut pos = 8;
    while pos < png.len() {
        let len = u32::from_be_bytes([png[pos], png[pos + 1], png[pos + 2], png[pos + 3]]) as usize;
        for i in pos + 8..pos + 8 + len {
            let mut corrupt = png.clone();
            corrupt[i] ^= 0x10;
            assert!(
                matches!(decode(&corrupt), Err(DecodingError::Checksum { .. })),
                "flipped byte {}",
                i
            );
        }
        pos += 12 + len;
    }
}

#[test]
fn every_truncation_fails() {
    let mut png = Vec::new();
    pngcodec::encode(&mut png, 4, 3, &random_pixels(36)).unwrap();
    for cut in 0..png.len() {
        assert!(
            matches!(decode(&png[..cut]), Err(DecodingError::TruncatedStream)),
            "cut at {}",
            cut
        );
    }
    assert!(decode(&png).is_ok());
}

#[test]
fn encoder_only_formats_are_unsupported() {
    fn check(configure: impl Fn(&mut Encoder), expected: UnsupportedFormat) {
        let mut encoder = Encoder::new(3, 3);
        configure(&mut encoder);
        let writer = encoder.build().unwrap();
        let mut png = Vec::new();
        writer
            .write_image(&mut png, &vec![0; writer.image_len()])
            .unwrap();
        match Decoder::new(&png[..]).read_info() {
            Err(DecodingError::UnsupportedFormat(found)) => assert_eq!(found, expected),
            Err(err) => panic!("expected {:?}, got {:?}", expected, err),
            Ok(_) => panic!("expected {:?}, got a reader", expected),
        }
    }

    check(
        |e| {
            e.set_greyscale(true);
        },
        UnsupportedFormat::ColorType(0),
    );
    check(
        |e| {
            e.set_alpha(true);
        },
        UnsupportedFormat::ColorType(6),
    );
    check(
        |e| {
            e.set_bytes_per_sample(2);
        },
        UnsupportedFormat::BitDepth(16),
    );
    check(
        |e| {
            e.set_interlaced(true);
        },
        UnsupportedFormat::InterlaceMethod(1),
    );
}

#[test]
fn invalid_configuration_writes_nothing() {
    let mut encoder = Encoder::new(2, 2);
    encoder.set_alpha(true).set_transparent(&[0, 0, 0]);
    assert!(matches!(
        encoder.build(),
        Err(EncodingError::Configuration(
            ConfigurationError::AlphaWithTransparent
        ))
    ));

    let mut out = Vec::new();
    assert!(pngcodec::encode(&mut out, 0, 1, &[]).is_err());
    assert!(out.is_empty());
}

/// Accepts a fixed number of bytes, then fails.
struct FailingWriter {
    left: usize,
}

impl Write for FailingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.left == 0 {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"));
        }
        let n = buf.len().min(self.left);
        self.left -= n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn write_errors_propagate() {
    let pixels = random_pixels(16 * 16 * 3);
    for left in [0, 5, 20, 60, 200] {
        match pngcodec::encode(FailingWriter { left }, 16, 16, &pixels) {
            Err(EncodingError::IoError(err)) => assert_eq!(err.kind(), io::ErrorKind::BrokenPipe),
            other => panic!("{} bytes: expected an io error, got {:?}", left, other),
        }
    }
}

/// Hands out at most a few bytes per read call.
struct Trickle<'a> {
    data: &'a [u8],
}

impl io::Read for Trickle<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.data.len()).min(3);
        buf[..n].copy_from_slice(&self.data[..n]);
        self.data = &self.data[n..];
        Ok(n)
    }
}

#[test]
fn short_reads() {
    let pixels = random_pixels(9 * 7 * 3);
    let mut png = Vec::new();
    pngcodec::encode(&mut png, 9, 7, &pixels).unwrap();

    let reader = Decoder::new(Trickle { data: &png }).read_info().unwrap();
    assert_eq!(reader.read_image().unwrap(), pixels);
}
