mod common;

use rand::Rng;
use swathio::{
    bytes::Endianness,
    model::{Kind, Sounding},
    oic::{ChannelDescriptor, OicCodec, OicRecord, SampleEncoding, Side, SonarType, Variant},
    AnyRecord, CodecConfig, Error, FormatCodec, FormatKind, Reader, Writer,
};
use test_case::test_case;

fn encode_all(variant: Variant, config: &CodecConfig, recs: &[OicRecord]) -> Vec<u8> {
    let mut writer = Writer::new(Vec::new(), OicCodec::new(variant, config));
    for rec in recs {
        writer.write_record(rec).expect("write should succeed");
    }
    writer.into_inner().unwrap()
}

fn comment(codec: &OicCodec, text: &str) -> OicRecord {
    let mut rec = codec.allocate().unwrap();
    codec.insert(&mut rec, &Sounding::comment(text)).unwrap();
    rec
}

#[test_case(Variant::Geo; "geo")]
#[test_case(Variant::Ge2; "ge2")]
fn records_reconstructed_on_read(variant: Variant) {
    let config = CodecConfig::default();
    let codec = OicCodec::new(variant, &config);
    let dat = encode_all(
        variant,
        &config,
        &[
            comment(&codec, "start of line"),
            common::angle_ping(1_600_000_000),
            common::angle_ping(1_600_000_001),
        ],
    );

    let mut reader = Reader::new(&dat[..], OicCodec::new(variant, &config)).unwrap();
    let recs: Vec<OicRecord> = reader.records().map(|r| r.unwrap()).collect();
    let kinds: Vec<Kind> = recs.iter().map(|r| r.kind).collect();
    assert_eq!(kinds, [Kind::Comment, Kind::Data, Kind::Data]);
    assert_eq!(recs[0].comment().as_deref(), Some("start of line"));

    let s = codec.extract(&recs[2]).unwrap();
    assert_eq!(s.bath.len(), 7);
    assert_eq!(s.bath[3], 100.0);
    assert!((s.time_d - 1_600_000_001.25).abs() < 1e-6);
    assert_eq!(reader.offset(), dat.len());
}

#[test_case(Variant::Geo; "geo")]
#[test_case(Variant::Ge2; "ge2")]
fn comment_with_channel_payload_precedes_data(variant: Variant) {
    let config = CodecConfig::default();
    let codec = OicCodec::new(variant, &config);
    let mut note = comment(&codec, "altimeter channel attached");
    note.header.num_chan = 1;
    note.header.channels[0] = ChannelDescriptor {
        sonar_type: SonarType::Sidescan.into(),
        side: Side::Port.into(),
        size: SampleEncoding::Short.into(),
        num_samples: 4,
        ..ChannelDescriptor::default()
    };
    let dat = note.raw[0].ensure_capacity(8).unwrap();
    for (k, s) in [3i16, -1, 400, 7].iter().enumerate() {
        dat[2 * k..2 * k + 2].copy_from_slice(&s.to_ne_bytes());
    }

    let dat = encode_all(
        variant,
        &config,
        &[note.clone(), common::angle_ping(1_600_000_000)],
    );
    let mut reader = Reader::new(&dat[..], OicCodec::new(variant, &config)).unwrap();
    let recs: Vec<OicRecord> = reader.records().map(|r| r.unwrap()).collect();
    let kinds: Vec<Kind> = recs.iter().map(|r| r.kind).collect();
    assert_eq!(kinds, [Kind::Comment, Kind::Data]);
    assert_eq!(
        recs[0].comment().as_deref(),
        Some("altimeter channel attached")
    );
    assert_eq!(recs[0].raw[0].as_slice(), note.raw[0].as_slice());
    assert_eq!(codec.extract(&recs[1]).unwrap().bath[3], 100.0);
    assert_eq!(reader.codec().skipped(), 0);
    assert_eq!(reader.offset(), dat.len());
}

#[test]
fn garbage_between_records_is_skipped() {
    let config = CodecConfig::default();
    let ping = encode_all(Variant::Ge2, &config, &[common::angle_ping(1_600_000_000)]);

    let mut rng = rand::thread_rng();
    let mut dat = Vec::new();
    for _ in 0..3 {
        let n = rng.gen_range(1..64);
        dat.extend((0..n).map(|_| loop {
            let b: u8 = rng.gen();
            if b != b'G' {
                break b;
            }
        }));
        dat.extend_from_slice(&ping);
    }

    let mut reader = Reader::new(&dat[..], OicCodec::new(Variant::Ge2, &config)).unwrap();
    let count = reader.records().filter(|r| r.is_ok()).count();
    assert_eq!(count, 3);
    assert!(reader.codec().skipped() > 0);
}

#[test_case(Endianness::Big; "big endian")]
#[test_case(Endianness::Little; "little endian")]
fn byte_order_does_not_change_values(order: Endianness) {
    let config = CodecConfig::builder().byte_order(order).build();
    let codec = OicCodec::new(Variant::Ge2, &config);

    let dat = encode_all(Variant::Ge2, &config, &[common::angle_ping(1_600_000_000)]);
    assert_eq!(&dat[..3], b"GE2");
    let mut reader = Reader::new(&dat[..], OicCodec::new(Variant::Ge2, &config)).unwrap();
    let rec = reader.read_record().unwrap().clone();
    let s = codec.extract(&rec).unwrap();
    assert!((s.navlat - 36.75).abs() < 1e-5);
    assert!((s.time_d - 1_600_000_000.25).abs() < 1e-6);
    assert_eq!(s.bath.len(), 7);
    assert_eq!(s.bath[3], 100.0);
    assert!(matches!(reader.read_record(), Err(Error::Eof)));
}

#[test]
fn edited_soundings_survive_file_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("line.ge2");
    let config = CodecConfig::default();

    let source = encode_all(Variant::Ge2, &config, &[common::angle_ping(1_600_000_000)]);
    let mut reader = Reader::new(&source[..], FormatKind::OicGe2.codec(&config)).unwrap();
    let mut rec: AnyRecord = reader.read_record().unwrap().clone();

    let codec = FormatKind::OicGe2.codec(&config);
    let mut s = codec.extract(&rec).unwrap();
    s.bath[1] = 77.5;
    s.beamflag[2] = swathio::model::Beamflag::MANUAL;
    codec.insert(&mut rec, &s).unwrap();

    let mut writer = Writer::create(&path, FormatKind::OicGe2, &config).unwrap();
    writer.write_record(&rec).unwrap();
    writer.flush().unwrap();
    drop(writer);

    let mut reader = Reader::open(&path, FormatKind::OicGe2, &config).unwrap();
    let back: Vec<AnyRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(back.len(), 1);
    let s = codec.extract(&back[0]).unwrap();
    assert_eq!(s.bath[1], 77.5);
    assert!(s.beamflag[2].is_flagged());
}

#[test]
fn truncated_record_ends_iteration() {
    let config = CodecConfig::default();
    let dat = encode_all(
        Variant::Geo,
        &config,
        &[
            common::angle_ping(1_600_000_000),
            common::angle_ping(1_600_000_001),
        ],
    );
    let cut = &dat[..dat.len() - 3];
    let mut reader = Reader::new(cut, OicCodec::new(Variant::Geo, &config)).unwrap();
    let recs: Vec<_> = reader.records().collect();
    assert_eq!(recs.len(), 1);
    assert!(recs[0].is_ok());
}
