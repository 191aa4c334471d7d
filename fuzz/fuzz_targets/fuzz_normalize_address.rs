#![no_main]

use libfuzzer_sys::fuzz_target;
use redis_dialer::client::address::{normalize, parse_host_port, split_scheme, Topology};

fuzz_target!(|address: &str| {
    let _ = normalize(address, Topology::Cluster);
    let standalone = normalize(address, Topology::Standalone);

    assert!(standalone.contains("://"));

    if let Some((scheme, rest)) = split_scheme(address) {
        assert_eq!(format!("{}://{}", scheme, rest), address);
    }
    let _ = parse_host_port(address);
});
