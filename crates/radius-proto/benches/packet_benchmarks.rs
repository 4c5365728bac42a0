use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use radius_proto::auth::{
    calculate_accounting_request_authenticator, deobfuscate_password, generate_request_authenticator,
    obfuscate_password,
};
use radius_proto::{Attribute, AttributeType, Code, Packet};

fn create_interim_packet(num_routes: usize) -> Packet {
    let mut packet = Packet::new(Code::AccountingRequest, 1, [0u8; 16]);
    let fields: [(AttributeType, &[u8]); 8] = [
        (AttributeType::UserName, b"testuser"),
        (AttributeType::FramedIpAddress, b"10.8.0.6"),
        (AttributeType::NasPort, b"1194"),
        (AttributeType::CallingStationId, b"198.51.100.7"),
        (AttributeType::AcctSessionId, b"5F3A9C01"),
        (AttributeType::AcctStatusType, b"3"),
        (AttributeType::AcctInputOctets, b"705032704"),
        (AttributeType::AcctInputGigawords, b"1"),
    ];
    for (attr_type, value) in fields {
        packet.add_attribute(
            Attribute::encode_value(attr_type as u8, value).expect("Failed to encode attribute"),
        );
    }

    for i in 0..num_routes {
        let route = format!("10.{}.0.0/16 10.8.0.1", i);
        if let Ok(attr) = Attribute::string(AttributeType::FramedRoute as u8, route) {
            packet.add_attribute(attr);
        }
    }

    packet
}

fn bench_packet_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("packet_encode");

    for num_routes in [0, 5, 10, 20].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(num_routes),
            num_routes,
            |b, &num_routes| {
                let packet = create_interim_packet(num_routes);
                b.iter(|| packet.encode().expect("Failed to encode packet"));
            },
        );
    }

    group.finish();
}

fn bench_packet_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("packet_decode");

    for num_routes in [0, 5, 10, 20].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(num_routes),
            num_routes,
            |b, &num_routes| {
                let encoded = create_interim_packet(num_routes)
                    .encode()
                    .expect("Failed to encode");
                b.iter(|| Packet::decode(black_box(&encoded)).expect("Failed to decode packet"));
            },
        );
    }

    group.finish();
}

fn bench_password_cipher(c: &mut Criterion) {
    let mut group = c.benchmark_group("password_cipher");

    let passwords: [(&str, &[u8]); 3] = [
        ("short", b"test"),
        ("medium", b"testpassword123"),
        ("long", b"this_is_a_very_long_password_to_test_performance"),
    ];

    for (name, password) in passwords {
        let secret = b"testing123";
        let req_auth = generate_request_authenticator();
        group.bench_with_input(BenchmarkId::new("obfuscate", name), password, |b, password| {
            b.iter(|| obfuscate_password(black_box(password), black_box(secret), black_box(&req_auth)));
        });

        let obfuscated = obfuscate_password(password, secret, &req_auth);
        group.bench_with_input(BenchmarkId::new("deobfuscate", name), &obfuscated, |b, obfuscated| {
            b.iter(|| {
                deobfuscate_password(black_box(obfuscated), black_box(secret), black_box(&req_auth))
                    .expect("Failed to deobfuscate password")
            });
        });
    }

    group.finish();
}

fn bench_request_authenticator(c: &mut Criterion) {
    let packet = create_interim_packet(5);
    c.bench_function("accounting_request_authenticator", |b| {
        b.iter(|| {
            calculate_accounting_request_authenticator(black_box(&packet), black_box(b"testing123"))
                .expect("Failed to seal packet")
        });
    });
}

criterion_group!(
    benches,
    bench_packet_encode,
    bench_packet_decode,
    bench_password_cipher,
    bench_request_authenticator
);
criterion_main!(benches);
