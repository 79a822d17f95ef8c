use layerbuild_lib::ApiVersion;

pub fn cmd_version() {
  println!("layerbuild {}", env!("CARGO_PKG_VERSION"));
  let apis: Vec<String> = ApiVersion::SUPPORTED.iter().map(ToString::to_string).collect();
  println!("Module APIs: {}", apis.join(", "));
}
