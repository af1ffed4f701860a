//! File wrapper behavior on real files

use std::io::{BufRead, Read, Seek, SeekFrom, Write};
use std::sync::Arc;
use tempfile::tempdir;
use zcodec::{decompress, train_dictionary, FileOptions, ZFile};

fn content() -> Vec<u8> {
    (0..5000)
        .flat_map(|i| format!("record {i:05} value {}\n", i * i % 1013).into_bytes())
        .collect()
}

#[test]
fn test_seeks_match_sequential_reads() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("data.zc");
    let data = content();
    {
        let mut file = ZFile::open(&path, "wb", FileOptions::with_level(7).unwrap()).unwrap();
        for chunk in data.chunks(4096) {
            file.write_all(chunk).unwrap();
        }
        file.close().unwrap();
    }
    assert_eq!(decompress(&std::fs::read(&path).unwrap()).unwrap(), data);

    let options = FileOptions {
        read_size: 997,
        ..FileOptions::default()
    };
    let mut file = ZFile::open(&path, "rb", options).unwrap();
    let positions = [0u64, 70_000, 12, 99_999, 50_000, 49_990, 1];
    let mut buf = [0u8; 64];
    for &pos in &positions {
        assert_eq!(file.seek(SeekFrom::Start(pos)).unwrap(), pos);
        file.read_exact(&mut buf).unwrap();
        let start = pos as usize;
        assert_eq!(&buf[..], &data[start..start + 64], "seek to {pos}");
        assert_eq!(file.tell(), pos + 64);
    }

    let len = file.seek(SeekFrom::End(0)).unwrap();
    assert_eq!(len, data.len() as u64);
    assert_eq!(file.read(&mut buf).unwrap(), 0);
}

#[test]
fn test_dictionary_file_round_trip() {
    let samples: Vec<Vec<u8>> = (0..100)
        .map(|i| format!("GET /api/v2/orders/{i} HTTP/1.1 host=shop.example accept=json\n").into_bytes())
        .collect();
    let dict = Arc::new(train_dictionary(&samples, 1024).unwrap());
    let options = FileOptions::default().dictionary(Arc::clone(&dict));

    let dir = tempdir().unwrap();
    let path = dir.path().join("requests.zc");
    {
        let mut file = ZFile::open(&path, "w", options.clone()).unwrap();
        for sample in samples.iter().take(10) {
            file.write_all(sample).unwrap();
        }
    }

    let file = ZFile::open(&path, "r", options).unwrap();
    let lines: Vec<String> = file.lines().map(|line| line.unwrap()).collect();
    assert_eq!(lines.len(), 10);
    assert_eq!(lines[3], "GET /api/v2/orders/3 HTTP/1.1 host=shop.example accept=json");

    let mut plain = ZFile::open(&path, "r", FileOptions::default()).unwrap();
    let mut out = Vec::new();
    assert!(plain.read_to_end(&mut out).is_err());
}

#[test]
fn test_rejected_modes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("unused.zc");
    for mode in ["rt", "wt", "r+", "", "rw"] {
        assert!(ZFile::open(&path, mode, FileOptions::default()).is_err(), "{mode:?}");
    }
}
