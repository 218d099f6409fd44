use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn write_config(dir: &Path) -> PathBuf {
    let config_path = dir.join("config.toml");
    let contents = format!(
        "database_path = {:?}\nreport_dir = {:?}\norganization = \"Iglesia Central\"\n\n[users]\ntesorero = \"clave\"\n",
        dir.join("congrega.db").to_string_lossy(),
        dir.to_string_lossy()
    );
    std::fs::write(&config_path, contents).expect("write config");
    config_path
}

fn run(config: &Path, user: &str, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_congrega"))
        .arg("--config")
        .arg(config)
        .args(["--user", user, "--password", "clave"])
        .args(args)
        .env_remove("CONGREGA_USER")
        .env_remove("CONGREGA_PASSWORD")
        .env("RUST_LOG", "off")
        .output()
        .expect("run congrega")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[test]
fn expense_needs_evidence_and_dashboard_shows_balance() {
    let dir = temp_dir("congrega-cli");
    let config = write_config(&dir);
    let evidence = dir.join("factura.pdf");
    std::fs::write(&evidence, b"%PDF-1.4 factura").expect("write evidence");

    let out = run(&config, "tesorero", &["add-movement", "--kind", "income", "--category", "Diezmos", "--amount", "100", "--date", "2026-02-01"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let out = run(&config, "tesorero", &["add-movement", "--kind", "expense", "--category", "Mantenimiento", "--amount", "40"]);
    assert!(!out.status.success());

    let out = run(
        &config,
        "tesorero",
        &["add-movement", "--kind", "gasto", "--category", "Mantenimiento", "--amount", "40", "--evidence", evidence.to_str().expect("utf-8")],
    );
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let out = run(&config, "tesorero", &["dashboard"]);
    assert!(out.status.success());
    let text = stdout(&out);
    assert!(text.contains("$60.00"), "{}", text);
    assert!(text.contains("Mantenimiento"));

    let out = run(&config, "tesorero", &["list", "movements"]);
    assert!(stdout(&out).contains("tesorero"));
}

#[test]
fn report_is_written_to_report_dir() {
    let dir = temp_dir("congrega-cli-report");
    let config = write_config(&dir);

    let out = run(&config, "tesorero", &["add-attendance", "--service", "Culto Dominical", "--men", "10", "--women", "12", "--children", "5"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let out = run(&config, "tesorero", &["report", "attendance"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let pdf = std::fs::read(dir.join("Asistencia.pdf")).expect("report file");
    assert!(pdf.starts_with(b"%PDF-"));
}

#[test]
fn wrong_password_is_rejected() {
    let dir = temp_dir("congrega-cli-auth");
    let config = write_config(&dir);

    let out = run(&config, "admin", &["dashboard"]);
    assert!(!out.status.success());
    assert!(!dir.join("Finanzas.pdf").exists());
}
