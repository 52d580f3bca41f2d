use crypt_core::{
    crypt_gensalt, crypt_gensalt_ra, crypt_gensalt_rn, crypt_preferred_method, crypt_rn, CryptData, CryptError,
    CRYPT_DATA_SIZE, CRYPT_GENSALT_OUTPUT_SIZE,
};

const ENTROPY: [&[u8; 16]; 4] = [
    b"\x58\x35\xcd\x26\x03\xab\x2c\x14\x92\x13\x1e\x59\xb0\xbc\xfe\xd5",
    b"\x9b\x35\xa2\x45\xeb\x68\x9e\x8f\xd9\xa9\x09\x71\xcc\x4d\x21\x44",
    b"\x25\x13\xc5\x94\xc3\x93\x1d\xf4\xfd\xd4\x4f\xbd\x10\xe5\x28\x08",
    b"\xa0\x2d\x35\x70\xa8\x0b\xc3\xad\xdf\x61\x69\xb3\x19\xda\x7e\x8d",
];

fn gensalt_each(prefix: &str, count: u64) -> Vec<String> {
    ENTROPY
        .iter()
        .map(|ent| {
            crypt_gensalt(Some(prefix), count, Some(&ent[..]))
                .unwrap_or_else(|e| panic!("{prefix}/{count}: {e}"))
        })
        .collect()
}

fn expect_settings(prefix: &str, count: u64, expected: [&str; 4]) {
    let got = gensalt_each(prefix, count);
    for (g, e) in got.iter().zip(expected) {
        assert_eq!(g, e, "{prefix}/{count}");
        assert!(g.starts_with(prefix));
    }
    for pair in got.windows(2) {
        assert_ne!(pair[0], pair[1], "{prefix}/{count}: repeated setting");
    }
}

fn with_suffixes(head: &str, tails: [&str; 4]) -> [String; 4] {
    tails.map(|t| format!("{head}{t}"))
}

fn as_strs(v: &[String; 4]) -> [&str; 4] {
    [&v[0], &v[1], &v[2], &v[3]]
}

/// A fresh setting must hash, and the hash must reproduce itself.
fn assert_hash_round_trips(setting: &str) {
    let mut a = vec![0u8; CRYPT_DATA_SIZE];
    let mut b = CryptData::boxed();
    let first = crypt_rn("alexander", setting, &mut a)
        .unwrap_or_else(|e| panic!("crypt({setting}): {e}"))
        .to_owned();
    let second = crypt_core::crypt_r("alexander", &first, &mut b).unwrap();
    assert_eq!(first, second, "{setting}");
}

// ── Fixed entropy ───────────────────────────────────────────────────────────

#[test]
fn traditional_des() {
    expect_settings("", 0, ["Mp", "Pp", "ZH", "Uh"]);
    assert_hash_round_trips("Mp");
}

#[test]
fn bsdi_des() {
    let salts = ["MJHn", "PKXc", "ZAFl", "UqGB"];
    expect_settings("_", 0, as_strs(&with_suffixes("_J9..", salts)));
    expect_settings("_", 16384, as_strs(&with_suffixes("_/.2.", salts)));
    expect_settings("_", 1, as_strs(&with_suffixes("_/...", salts)));
    expect_settings("_", u64::MAX, as_strs(&with_suffixes("_zzzz", salts)));
    assert_hash_round_trips("_J9..MJHn");
}

#[test]
fn md5crypt() {
    expect_settings("$1$", 0, ["$1$MJHnaAke", "$1$PKXc3hCO", "$1$ZAFlICwY", "$1$UqGBkVu0"]);
    assert_hash_round_trips("$1$MJHnaAke");
}

#[test]
fn sunmd5() {
    let zero = [
        "$md5,rounds=55349$BPm.fm03$",
        "$md5,rounds=72501$WKoucttX$",
        "$md5,rounds=42259$3HtkHq/x$",
        "$md5,rounds=73773$p.5e9AQf$",
    ];
    expect_settings("$md5", 0, zero);
    expect_settings("$md5", 1, zero);
    expect_settings(
        "$md5",
        u64::MAX,
        [
            "$md5,rounds=4294924340$BPm.fm03$",
            "$md5,rounds=4294941492$WKoucttX$",
            "$md5,rounds=4294911250$3HtkHq/x$",
            "$md5,rounds=4294942764$p.5e9AQf$",
        ],
    );
    assert_hash_round_trips(zero[0]);
}

#[test]
fn sha1crypt() {
    expect_settings(
        "$sha1",
        0,
        [
            "$sha1$248488$ggu.H673kaZ5$",
            "$sha1$248421$SWqudaxXA5L0$",
            "$sha1$257243$RAtkIrDxEovH$",
            "$sha1$250464$1j.eVxRfNAPO$",
        ],
    );
    expect_settings(
        "$sha1",
        1,
        [
            "$sha1$4$ggu.H673kaZ5$",
            "$sha1$4$SWqudaxXA5L0$",
            "$sha1$4$RAtkIrDxEovH$",
            "$sha1$4$1j.eVxRfNAPO$",
        ],
    );
    expect_settings(
        "$sha1",
        u64::MAX,
        [
            "$sha1$3643984551$ggu.H673kaZ5$",
            "$sha1$4200450659$SWqudaxXA5L0$",
            "$sha1$3946507480$RAtkIrDxEovH$",
            "$sha1$3486175838$1j.eVxRfNAPO$",
        ],
    );
    assert_hash_round_trips("$sha1$4$ggu.H673kaZ5$");
}

#[test]
fn sha2crypt() {
    let salts = ["MJHnaAkegEVYHsFK", "PKXc3hCOSyMqdaEQ", "ZAFlICwYRETzIzIj", "UqGBkVu01rurVZqg"];
    for prefix in ["$5$", "$6$", "$sm3$"] {
        expect_settings(prefix, 0, as_strs(&with_suffixes(prefix, salts)));
        for (count, rounds) in [(10191, "10191"), (1, "1000"), (u64::MAX, "999999999")] {
            let head = format!("{prefix}rounds={rounds}$");
            expect_settings(prefix, count, as_strs(&with_suffixes(&head, salts)));
        }
        assert_hash_round_trips(&format!("{prefix}{}", salts[0]));
    }
}

#[test]
fn bcrypt() {
    let salts = [
        "UBVLHeMpJ/QQCv3XqJx8zO",
        "kxUgPcrmlm9XoOjvxCyfP.",
        "HPNDjKMRFdR7zC87CMSmA.",
        "mAyzaIeJu41dWUkxEbn8hO",
    ];
    for prefix in ["$2b$", "$2a$", "$2y$"] {
        expect_settings(prefix, 0, as_strs(&with_suffixes(&format!("{prefix}05$"), salts)));
    }
    expect_settings("$2b$", 4, as_strs(&with_suffixes("$2b$04$", salts)));
    expect_settings("$2b$", 31, as_strs(&with_suffixes("$2b$31$", salts)));
    assert_hash_round_trips("$2b$04$UBVLHeMpJ/QQCv3XqJx8zO");
}

#[test]
fn bcrypt_x_cannot_be_generated() {
    assert_eq!(crypt_gensalt(Some("$2x$"), 0, Some(&ENTROPY[0][..])), Err(CryptError::Invalid));
}

#[test]
fn scrypt() {
    let salts = ["MJHnaAkegEVYHsFKkmfzJ1", "PKXc3hCOSyMqdaEQArI62/", "ZAFlICwYRETzIzIjEIC86.", "UqGBkVu01rurVZqgNchTB0"];
    expect_settings("$7$", 0, as_strs(&with_suffixes("$7$CU..../....", salts)));
    expect_settings("$7$", 6, as_strs(&with_suffixes("$7$BU..../....", salts)));
    expect_settings("$7$", 11, as_strs(&with_suffixes("$7$GU..../....", salts)));
    // N = 2^1 keeps the round trip quick.
    assert_hash_round_trips(&format!("$7$0U..../....{}", salts[0]));
}

#[test]
fn yescrypt() {
    let salts = ["MJHnaAkegEVYHsFKkmfzJ1", "PKXc3hCOSyMqdaEQArI62/", "ZAFlICwYRETzIzIjEIC86.", "UqGBkVu01rurVZqgNchTB0"];
    for prefix in ["$y$", "$gy$", "$sm3y$"] {
        for (count, params) in [(0, "j9T$"), (1, "j75$"), (3, "j7T$"), (11, "jFT$")] {
            let head = format!("{prefix}{params}");
            expect_settings(prefix, count, as_strs(&with_suffixes(&head, salts)));
        }
        assert_eq!(crypt_gensalt(Some(prefix), 12, Some(&ENTROPY[0][..])), Err(CryptError::Invalid));
        // N = 2^8 keeps the round trip quick.
        assert_hash_round_trips(&format!("{prefix}j55${}", salts[0]));
    }
}

#[test]
fn yescrypt_wants_sixteen_random_bytes() {
    for prefix in ["$y$", "$gy$", "$sm3y$"] {
        assert_eq!(crypt_gensalt(Some(prefix), 0, Some(&ENTROPY[0][..15])), Err(CryptError::Invalid));
    }
}

#[test]
fn argon2() {
    for prefix in ["$argon2id$", "$argon2i$", "$argon2d$"] {
        let got = gensalt_each(prefix, 1);
        for g in &got {
            assert!(g.starts_with(&format!("{prefix}v=19$m=4096,t=1,p=1$")), "{g}");
            assert!(g.ends_with('$'));
        }
        assert_eq!(got[0], format!("{prefix}v=19$m=4096,t=1,p=1$WDXNJgOrLBSSEx5ZsLz+1Q$"));
    }
    assert_hash_round_trips("$argon2id$v=19$m=64,t=1,p=1$WDXNJgOrLBSSEx5ZsLz+1Q$");
}

// ── Defaults and buffers ────────────────────────────────────────────────────

#[test]
fn no_prefix_means_preferred_method() {
    let explicit = crypt_gensalt_ra(Some(crypt_preferred_method()), 0, Some(&ENTROPY[0][..])).unwrap();
    let implicit = crypt_gensalt_ra(None, 0, Some(&ENTROPY[0][..])).unwrap();
    assert_eq!(explicit, implicit);
    assert_eq!(implicit, "$y$j9T$MJHnaAkegEVYHsFKkmfzJ1");
}

#[test]
fn os_entropy_gives_distinct_settings() {
    // Traditional DES salts are only twelve bits, so repeats are expected.
    for prefix in ["_", "$1$", "$md5", "$sha1", "$5$", "$6$", "$2b$", "$7$", "$argon2id$", "$y$", "$gy$", "$sm3y$", "$sm3$"] {
        let a = crypt_gensalt(Some(prefix), 0, None).unwrap();
        let b = crypt_gensalt(Some(prefix), 0, None).unwrap();
        assert!(a.starts_with(prefix));
        assert_eq!(a.len(), b.len(), "{prefix}");
        assert_ne!(a, b, "{prefix}");
    }
}

#[test]
fn unknown_prefix_leaves_failure_token() {
    let mut out = [0xffu8; CRYPT_GENSALT_OUTPUT_SIZE];
    assert_eq!(
        crypt_gensalt_rn(Some("$un$upp0rt3d$"), 0, Some(&ENTROPY[0][..]), &mut out),
        Err(CryptError::Invalid)
    );
    assert_eq!(&out[..3], b"*0\0");
}

#[test]
fn tiny_output_buffer() {
    let mut out = [0u8; 2];
    assert_eq!(crypt_gensalt_rn(None, 0, Some(&ENTROPY[0][..]), &mut out), Err(CryptError::Range));
}
