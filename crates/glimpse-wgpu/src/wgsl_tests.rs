#[test]
fn shader_sources_parse() {
    parse_wgsl("quad.wgsl", include_str!("shaders/quad.wgsl"));
    parse_wgsl("line.wgsl", include_str!("shaders/line.wgsl"));
}

fn parse_wgsl(label: &str, source: &str) {
    naga::front::wgsl::parse_str(source).unwrap_or_else(|error| {
        panic!("WGSL parse failed for {label}: {}", error.emit_to_string(source))
    });
}
