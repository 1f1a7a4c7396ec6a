//! Shared fixtures: throwaway credentials and archive readers.

#![allow(dead_code)]

use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::hash::MessageDigest;
use openssl::pkcs12::Pkcs12;
use openssl::pkcs7::{Pkcs7, Pkcs7Flags};
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::stack::Stack;
use openssl::x509::store::X509StoreBuilder;
use openssl::x509::{X509Builder, X509NameBuilder, X509};
use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::path::Path;
use zip::ZipArchive;

pub const PASSWORD: &str = "pass-secret";

pub struct TestCredentials {
    pub p12: Vec<u8>,
    pub certificate: X509,
}

fn generate_key() -> PKey<Private> {
    PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap()
}

fn self_signed(key: &PKey<Private>, common_name: &str, serial: u32) -> X509 {
    let mut name_builder = X509NameBuilder::new().unwrap();
    name_builder.append_entry_by_text("CN", common_name).unwrap();
    let name = name_builder.build();

    let mut builder = X509Builder::new().unwrap();
    builder.set_version(2).unwrap();
    let serial = BigNum::from_u32(serial).unwrap();
    builder
        .set_serial_number(&serial.to_asn1_integer().unwrap())
        .unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(key).unwrap();
    builder
        .set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::days_from_now(365).unwrap())
        .unwrap();
    builder.sign(key, MessageDigest::sha256()).unwrap();
    builder.build()
}

/// PKCS#12 container protected by [`PASSWORD`].
pub fn credentials() -> TestCredentials {
    let key = generate_key();
    let certificate = self_signed(&key, "Pass Type ID: pass.com.example.test", 1);
    let p12 = Pkcs12::builder()
        .name("Pass Type ID")
        .pkey(&key)
        .cert(&certificate)
        .build2(PASSWORD)
        .unwrap()
        .to_der()
        .unwrap();

    TestCredentials { p12, certificate }
}

/// PEM-encoded stand-in for the WWDR intermediate.
pub fn intermediate_pem() -> (Vec<u8>, Vec<u8>) {
    let key = generate_key();
    let cert = self_signed(&key, "Test Worldwide Developer Relations", 2);
    (cert.to_pem().unwrap(), cert.to_der().unwrap())
}

/// Entry name → content, in archive order.
pub fn read_archive(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    (0..archive.len())
        .map(|i| {
            let mut entry = archive.by_index(i).unwrap();
            let mut data = Vec::new();
            entry.read_to_end(&mut data).unwrap();
            (entry.name().to_string(), data)
        })
        .collect()
}

pub fn archive_map(bytes: &[u8]) -> BTreeMap<String, Vec<u8>> {
    read_archive(bytes).into_iter().collect()
}

/// Check a detached signature against `content` without chain validation.
pub fn signature_verifies(signature: &[u8], content: &[u8]) -> bool {
    let Ok(pkcs7) = Pkcs7::from_der(signature) else {
        return false;
    };
    let certs = Stack::<X509>::new().unwrap();
    let store = X509StoreBuilder::new().unwrap().build();
    pkcs7
        .verify(
            &certs,
            &store,
            Some(content),
            None,
            Pkcs7Flags::NOVERIFY | Pkcs7Flags::BINARY,
        )
        .is_ok()
}

pub fn dir_is_empty(path: &Path) -> bool {
    std::fs::read_dir(path).unwrap().next().is_none()
}
