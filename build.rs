use time::format_description;

fn stamp(var: &str, fmt: &str, now: time::OffsetDateTime) -> String {
    if let Ok(v) = std::env::var(var) {
        return v;
    }
    format_description::parse(fmt)
        .ok()
        .and_then(|f| now.format(&f).ok())
        .unwrap_or_else(|| "unknown".to_string())
}

fn main() {
    let now = time::OffsetDateTime::now_utc();

    let date = stamp("NIFCORE_BUILD_DATE", "[year]-[month]-[day]", now);
    let time = stamp("NIFCORE_BUILD_TIME", "[hour]:[minute]", now);

    println!("cargo:rerun-if-env-changed=NIFCORE_BUILD_DATE");
    println!("cargo:rerun-if-env-changed=NIFCORE_BUILD_TIME");
    println!("cargo:rustc-env=NIFCORE_BUILD_STAMP={} {}", date, time);
}
