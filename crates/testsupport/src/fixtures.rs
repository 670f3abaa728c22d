use anyhow::Result;
use std::fs;
use std::path::Path;

/// Minimal ASGI application answering 200 "ok" to every request. The
/// manifest pulls only the server package so image builds stay small.
const ASGI_APP: &str = r#"async def app(scope, receive, send):
    if scope["type"] != "http":
        return
    await send({
        "type": "http.response.start",
        "status": 200,
        "headers": [(b"content-type", b"text/plain")],
    })
    await send({"type": "http.response.body", "body": b"ok"})
"#;

pub fn write_server_app(root: &Path) -> Result<()> {
    fs::write(root.join("requirements.txt"), "uvicorn\n")?;
    fs::write(root.join("app.py"), ASGI_APP)?;
    fs::create_dir_all(root.join("src"))?;
    fs::write(root.join("src/__init__.py"), "")?;
    Ok(())
}

/// Script that prints one line and exits cleanly, for exit-code checks.
pub fn write_script_app(root: &Path) -> Result<()> {
    fs::write(root.join("requirements.txt"), "\n")?;
    fs::write(root.join("app.py"), "print(\"script done\")\n")?;
    fs::create_dir_all(root.join("src"))?;
    fs::write(root.join("src/__init__.py"), "")?;
    Ok(())
}
