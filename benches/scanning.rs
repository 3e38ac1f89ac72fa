use std::time::Duration;

use divan::Bencher;
use mpa_demux::demuxer::FrameParser;
use mpa_demux::{Mp3Demuxer, TrackType};

fn main() {
    divan::main();
}

const HEADER_128K: [u8; 4] = [0xFF, 0xFB, 0x90, 0x00];
const FRAME_LEN: usize = 417;

/// About 26 seconds of silent 128kbps frames.
fn stream() -> Vec<u8> {
    let mut data = Vec::with_capacity(1000 * FRAME_LEN);
    for _ in 0..1000 {
        let start = data.len();
        data.resize(start + FRAME_LEN, 0);
        data[start..start + 4].copy_from_slice(&HEADER_128K);
    }
    data
}

#[divan::bench]
fn locate_frames(bencher: Bencher) {
    let data = stream();
    bencher.bench_local(|| {
        let mut parser = FrameParser::new();
        let mut rest = divan::black_box(data.as_slice());
        while let Some(pos) = parser.parse(rest) {
            let next = pos as usize + parser.current_frame().length() as usize;
            parser.end_frame_session();
            if next >= rest.len() {
                break;
            }
            rest = &rest[next..];
        }
    })
}

#[divan::bench(args = [512, 4096, 65536])]
fn demux_all(bencher: Bencher, read_size: usize) {
    bencher.with_inputs(stream).bench_values(|data| {
        let mut demuxer = Mp3Demuxer::builder()
            .with_source(data)
            .with_read_size(read_size)
            .build()
            .unwrap();
        demuxer.init().unwrap();
        let track = demuxer.track_demuxer(TrackType::Audio, 0).unwrap();
        while let Ok(packets) = track.get_samples(64) {
            packets.into_iter().for_each(divan::black_box_drop);
        }
    })
}

#[divan::bench]
fn seek(bencher: Bencher) {
    let mut demuxer = Mp3Demuxer::new(stream());
    demuxer.init().unwrap();
    let track = demuxer.track_demuxer(TrackType::Audio, 0).unwrap();
    bencher.bench_local(|| {
        divan::black_box(track.seek(Duration::from_secs(20)).unwrap());
        divan::black_box(track.seek(Duration::from_secs(3)).unwrap());
    })
}
