use std::path::Path;
#[cfg(any(target_os = "macos", target_os = "linux", target_os = "windows"))]
use std::process::Command;

use crate::errors::{ApodError, Result};

/// Sets the desktop background to the image at `path`.
///
/// Each platform gets the file as an absolute path; relative paths break
/// desktop daemons that resolve them against their own working directory.
pub fn set_desktop_background(path: &Path) -> Result<()> {
    let absolute = std::fs::canonicalize(path)
        .map_err(|e| ApodError::Wallpaper(format!("{}: {}", path.display(), e)))?;
    set_platform_background(&absolute)
}

#[cfg(target_os = "macos")]
fn set_platform_background(path: &Path) -> Result<()> {
    let script = format!(
        "tell application \"System Events\" to tell every desktop to set picture to \"{}\"",
        path.display()
    );
    run_checked(Command::new("osascript").args(["-e", &script]))
}

#[cfg(target_os = "linux")]
fn set_platform_background(path: &Path) -> Result<()> {
    let uri = format!("file://{}", path.display());
    // GNOME reads picture-uri-dark on dark themes, so set both
    run_checked(Command::new("gsettings").args([
        "set",
        "org.gnome.desktop.background",
        "picture-uri",
        &uri,
    ]))?;
    run_checked(Command::new("gsettings").args([
        "set",
        "org.gnome.desktop.background",
        "picture-uri-dark",
        &uri,
    ]))
}

#[cfg(target_os = "windows")]
fn set_platform_background(path: &Path) -> Result<()> {
    let script = format!(
        "Set-ItemProperty -Path 'HKCU:\\Control Panel\\Desktop' -Name Wallpaper -Value '{}'; \
         rundll32.exe user32.dll,UpdatePerUserSystemParameters",
        path.display()
    );
    run_checked(Command::new("powershell").args(["-NoProfile", "-Command", &script]))
}

#[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
fn set_platform_background(_path: &Path) -> Result<()> {
    Err(ApodError::Wallpaper(
        "setting the desktop background is not supported on this platform".to_string(),
    ))
}

#[cfg(any(target_os = "macos", target_os = "linux", target_os = "windows"))]
fn run_checked(command: &mut Command) -> Result<()> {
    let output = command
        .output()
        .map_err(|e| ApodError::Wallpaper(e.to_string()))?;
    if output.status.success() {
        Ok(())
    } else {
        Err(ApodError::Wallpaper(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ))
    }
}
