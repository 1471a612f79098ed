use std::env;

fn main() {
    // 環境変数をコンパイル時に埋め込み
    // ENVIRONMENT環境変数に基づいて適切な.envファイルを読み込み
    let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

    let env_file = match environment.as_str() {
        "production" => ".env.production",
        _ => ".env",
    };

    println!("cargo:rerun-if-env-changed=ENVIRONMENT");
    println!("cargo:rerun-if-changed={env_file}");

    // 環境変数ファイルを読み込み
    if dotenv::from_filename(env_file).is_ok() {
        println!("cargo:warning={env_file}ファイルを読み込みました");

        // 台帳の動作設定をコンパイル時定数として埋め込み
        if let Ok(timezone) = env::var("SNT_TIMEZONE") {
            println!("cargo:rustc-env=EMBEDDED_SNT_TIMEZONE={timezone}");
        }
        if let Ok(history) = env::var("SNT_CONFIRMED_HISTORY") {
            println!("cargo:rustc-env=EMBEDDED_SNT_CONFIRMED_HISTORY={history}");
        }
        if let Ok(resolution) = env::var("SNT_RATE_RESOLUTION") {
            println!("cargo:rustc-env=EMBEDDED_SNT_RATE_RESOLUTION={resolution}");
        }

        // 注意: EMBEDDED_ENVIRONMENTは設定しない
        // 実行時に.envファイルから環境変数を読み込むため
    }
}
