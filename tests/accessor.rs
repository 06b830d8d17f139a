use std::io::IoSlice;
use std::sync::Arc;
use std::thread;

use attrgate::ipcomp::{IpComponents, install_local_address};
use attrgate::log::MemorySink;
use attrgate::store::MemoryObject;
use attrgate::{
    AttrType, AttrValue, AttributeStore, Fill, FileRead, LogSink, ModuleUtils, UtilsConfig, Verbosity,
    coalesce_vectors, read_entire_file,
};

fn utils() -> (ModuleUtils, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let utils = ModuleUtils::with_config(UtilsConfig::default(), Arc::clone(&sink) as Arc<dyn LogSink>);
    (utils, sink)
}

#[test]
fn missing_timeout_defaults_once() {
    let (utils, sink) = utils();
    let prefs = MemoryObject::new();

    let mut buf = [0u8; 4];
    let fill = utils.get_attribute(&prefs, "timeout", AttrType::Int32, &mut buf, Some(&30i32.to_ne_bytes()));
    assert_eq!(fill, Fill::Defaulted(4));
    assert_eq!(i32::from_ne_bytes(buf), 30);
    assert_eq!(sink.len(), 1);
    assert_eq!(sink.lines()[0].0, Verbosity::Message);
    assert!(sink.lines()[0].1.contains("timeout"));

    let mut again = [0u8; 4];
    let fill = utils.get_attribute(&prefs, "timeout", AttrType::Int32, &mut again, Some(&30i32.to_ne_bytes()));
    assert_eq!(fill, Fill::Stored(4));
    assert_eq!(i32::from_ne_bytes(again), 30);
    assert_eq!(sink.len(), 1, "re-read must not log again");
}

#[test]
fn string_stored_mode_read_as_int_behaves_as_absent() {
    let (utils, _sink) = utils();
    let prefs = MemoryObject::new();
    prefs.insert("mode", AttrValue::CharArray("fast".into())).unwrap();

    assert_eq!(utils.get_value(&prefs, "mode", 5i32), 5);
    // self-healed: the next read finds a proper Int32
    assert_eq!(utils.get_value(&prefs, "mode", 9i32), 5);
}

#[test]
fn type_mismatch_matches_absent_outcome() {
    let (utils, _) = utils();
    let absent = MemoryObject::new();
    let mismatched = MemoryObject::new();
    mismatched.insert("depth", AttrValue::Bool(true)).unwrap();

    let mut a = [0u8; 8];
    let mut b = [0u8; 8];
    let default = 64u64.to_ne_bytes();
    let fa = utils.get_attribute(&absent, "depth", AttrType::UInt64, &mut a, Some(&default));
    let fb = utils.get_attribute(&mismatched, "depth", AttrType::UInt64, &mut b, Some(&default));
    assert_eq!(fa, fb);
    assert_eq!(a, b);
}

#[test]
fn stored_value_roundtrips_with_set() {
    let (utils, _) = utils();
    let prefs = MemoryObject::new();
    let id = prefs.add_attribute("banner", AttrType::CharArray).unwrap();
    prefs.set_value(id, 0, b"Darwin Streaming").unwrap();

    let mut buf = [0u8; 32];
    let fill = utils.get_attribute(&prefs, "banner", AttrType::CharArray, &mut buf, Some(b"x"));
    assert_eq!(fill, Fill::Stored(16));
    assert_eq!(&buf[..16], b"Darwin Streaming");
}

#[test]
fn never_writes_past_the_buffer() {
    let (utils, _) = utils();
    let prefs = MemoryObject::new();
    prefs.insert("sdp", AttrValue::Bytes(vec![7; 64])).unwrap();

    let mut backing = [0xCCu8; 12];
    let (buf, guard) = backing.split_at_mut(8);
    let fill = utils.get_attribute(&prefs, "sdp", AttrType::Bytes, buf, None);
    assert_eq!(fill, Fill::Unset);
    assert_eq!(guard, &[0xCC; 4]);
}

#[test]
fn string_attribute_is_stable() {
    let (utils, _) = utils();
    let prefs = MemoryObject::new();
    let first = utils.get_string_attribute(&prefs, "movie_folder", Some("/var/movies")).unwrap();
    let second = utils.get_string_attribute(&prefs, "movie_folder", Some("/var/movies")).unwrap();
    assert_eq!(first.as_bytes(), second.as_bytes());
    assert_eq!(utils.get_string_attribute(&prefs, "unset_folder", None).unwrap(), "");
}

#[test]
fn address_list_membership() {
    let utils = ModuleUtils::new();
    let prefs = MemoryObject::new();
    let list = prefs
        .insert_list("ip_allow_list", AttrType::CharArray, [b"10.0.0.1".as_slice(), b"10.0.0.2"])
        .unwrap();

    assert!(utils.address_in_list(&prefs, list, "10.0.0.2"));
    assert!(!utils.address_in_list(&prefs, list, "10.0.0.3"));
}

#[test]
fn local_address_checks() {
    assert!(install_local_address("127.0.0.1"));
    assert!(!install_local_address("10.1.1.1"), "installed once");

    assert!(IpComponents::parse("127.0.0.1").is_local());
    assert!(!IpComponents::parse("127.0.0.2").is_local());
    assert!(!IpComponents::parse("127.0.0").is_local());

    let cfg = UtilsConfig { local_address: "192.168.0.10".into(), ..Default::default() };
    let utils = ModuleUtils::with_config(cfg, Arc::new(MemorySink::new()));
    assert!(utils.is_local(&IpComponents::parse("192.168.0.10")));
    assert!(!utils.is_local(&IpComponents::parse("127.0.0.1")));
}

#[test]
fn unmodified_file_is_not_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("module.xml");
    std::fs::write(&path, b"<PREF NAME=\"x\">1</PREF>").unwrap();
    let mtime = std::fs::metadata(&path).unwrap().modified().unwrap();

    match read_entire_file(&path, Some(mtime)).unwrap() {
        FileRead::NotModified { modified } => assert_eq!(modified, mtime),
        other => panic!("expected NotModified, got {other:?}"),
    }

    match read_entire_file(&path, Some(std::time::UNIX_EPOCH)).unwrap() {
        FileRead::Data { bytes, modified } => {
            assert_eq!(bytes, b"<PREF NAME=\"x\">1</PREF>");
            assert_eq!(modified, mtime);
        }
        other => panic!("expected Data, got {other:?}"),
    }

    let read = read_entire_file(&path, None).unwrap();
    assert!(matches!(read, FileRead::Data { ref bytes, .. } if bytes.len() == 23));
}

#[test]
fn coalesced_length_matches_declared_total() {
    let head = b"RTSP/1.0 200 OK\r\n";
    let body = b"v=0\r\n";
    let out = coalesce_vectors(&[IoSlice::new(head), IoSlice::new(body)], head.len() + body.len()).unwrap();
    assert_eq!(out.len(), head.len() + body.len());
    assert_eq!(&out[..head.len()], head);
    assert_eq!(&out[head.len()..], body);
}

#[test]
fn concurrent_defaulting_on_shared_object() {
    let (utils, _) = utils();
    let utils = Arc::new(utils);
    let prefs = Arc::new(MemoryObject::new());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let utils = Arc::clone(&utils);
            let prefs = Arc::clone(&prefs);
            thread::spawn(move || utils.get_value(&*prefs, "max_bitrate", 1500u32))
        })
        .collect();

    for h in handles {
        assert_eq!(h.join().unwrap(), 1500);
    }
    let id = prefs.attr_id("max_bitrate").unwrap();
    assert_eq!(prefs.num_values(id), 1);
}
