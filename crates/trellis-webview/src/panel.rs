//! Panel creation: placement, security settings and icon.

use std::str::FromStr;

use tracing::{debug, warn};
use trellis_core::{
    BoxedPanel, ConnectorOptions, Host, HostResult, Location, Notice, PanelSpec, Profile,
    ViewColumn,
};
use url::Url;

use crate::resolver::ResolvedSource;

/// Picks the panel column.
///
/// First match wins: explicit column, profile location, beside the active
/// view, then the first column.
pub fn resolve_placement(
    options: &ConnectorOptions,
    profile: &Profile,
    host: &dyn Host,
) -> ViewColumn {
    if let Some(column) = options.column {
        return column;
    }

    if let Some(location) = profile.location.as_deref() {
        match Location::from_str(location) {
            Ok(Location::SidePanel) => return ViewColumn::Beside,
            Ok(Location::MainPanel) => return ViewColumn::Active,
            Err(_) => {
                warn!(plugin = %profile.name, location = %location, "Unknown panel location");
                host.notify(Notice::LocationWarning {
                    plugin: profile.name.clone(),
                    location: location.to_string(),
                });
            }
        }
    }

    if host.has_active_view() {
        ViewColumn::Beside
    } else {
        ViewColumn::ONE
    }
}

/// Builds the creation request for `source`.
///
/// Scripts are always enabled. Local content may load resources from its base
/// directory only; remote content gets no local roots.
pub fn panel_spec(
    profile: &Profile,
    options: &ConnectorOptions,
    source: &ResolvedSource,
    host: &dyn Host,
) -> PanelSpec {
    let local_resource_roots = match source {
        ResolvedSource::Local { base, .. } => vec![base.clone()],
        ResolvedSource::Remote { .. } => Vec::new(),
    };

    PanelSpec {
        view_type: profile.name.clone(),
        title: profile.title().to_string(),
        column: resolve_placement(options, profile, host),
        enable_scripts: true,
        local_resource_roots,
    }
}

/// Sets the profile icon. An unparseable icon is reported, never fatal.
pub fn apply_icon(panel: &BoxedPanel, profile: &Profile, host: &dyn Host) {
    let Some(icon) = profile.icon.as_deref() else {
        return;
    };
    match Url::parse(icon) {
        Ok(url) => panel.set_icon(&url),
        Err(e) => {
            warn!(plugin = %profile.name, icon = %icon, error = %e, "Invalid panel icon");
            host.notify(Notice::IconError {
                plugin: profile.name.clone(),
                icon: icon.to_string(),
                reason: e.to_string(),
            });
        }
    }
}

/// Creates and decorates the panel for `source`.
pub fn open_panel(
    profile: &Profile,
    options: &ConnectorOptions,
    source: &ResolvedSource,
    host: &dyn Host,
) -> HostResult<BoxedPanel> {
    let spec = panel_spec(profile, options, source, host);
    debug!(plugin = %profile.name, column = ?spec.column, "Creating panel");
    let panel = host.create_panel(spec)?;
    apply_icon(&panel, profile, host);
    Ok(panel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingHost;
    use std::path::PathBuf;

    fn local() -> ResolvedSource {
        ResolvedSource::Local {
            base: PathBuf::from("/ext/widget"),
            html_file: true,
        }
    }

    #[test]
    fn test_explicit_column_wins() {
        let host = RecordingHost::new().with_active_view(true);
        let profile = Profile::new("w").with_location("sidePanel");
        let options = ConnectorOptions::default().with_column(ViewColumn::Index(3));
        assert_eq!(resolve_placement(&options, &profile, &host), ViewColumn::Index(3));
    }

    #[test]
    fn test_profile_location() {
        let host = RecordingHost::new();
        let options = ConnectorOptions::default();
        assert_eq!(
            resolve_placement(&options, &Profile::new("w").with_location("sidePanel"), &host),
            ViewColumn::Beside
        );
        assert_eq!(
            resolve_placement(&options, &Profile::new("w").with_location("mainPanel"), &host),
            ViewColumn::Active
        );
    }

    #[test]
    fn test_default_placement() {
        let options = ConnectorOptions::default();
        let profile = Profile::new("w");
        assert_eq!(
            resolve_placement(&options, &profile, &RecordingHost::new().with_active_view(true)),
            ViewColumn::Beside
        );
        assert_eq!(
            resolve_placement(&options, &profile, &RecordingHost::new()),
            ViewColumn::ONE
        );
    }

    #[test]
    fn test_unknown_location_warns_and_falls_through() {
        let host = RecordingHost::new();
        let profile = Profile::new("w").with_location("floating");
        let column = resolve_placement(&ConnectorOptions::default(), &profile, &host);
        assert_eq!(column, ViewColumn::ONE);
        assert_eq!(
            host.notices(),
            vec![Notice::LocationWarning {
                plugin: "w".into(),
                location: "floating".into(),
            }]
        );
    }

    #[test]
    fn test_panel_spec_roots() {
        let host = RecordingHost::new();
        let profile = Profile::new("w").with_display_name("Widget");
        let options = ConnectorOptions::default();

        let spec = panel_spec(&profile, &options, &local(), &host);
        assert_eq!(spec.view_type, "w");
        assert_eq!(spec.title, "Widget");
        assert!(spec.enable_scripts);
        assert_eq!(spec.local_resource_roots, vec![PathBuf::from("/ext/widget")]);

        let remote = ResolvedSource::Remote {
            url: "https://example.com".into(),
            base: "https://example.com".into(),
            html_file: false,
        };
        let spec = panel_spec(&profile, &options, &remote, &host);
        assert!(spec.enable_scripts);
        assert!(spec.local_resource_roots.is_empty());
    }

    #[test]
    fn test_invalid_icon_is_reported() {
        let host = RecordingHost::new();
        let profile = Profile::new("w").with_icon("not a url");
        open_panel(&profile, &ConnectorOptions::default(), &local(), &host).unwrap();

        assert_eq!(host.panel_count(), 1);
        assert!(host.last_panel().unwrap().icon().is_none());
        assert!(matches!(
            host.notices().as_slice(),
            [Notice::IconError { plugin, icon, .. }] if plugin == "w" && icon == "not a url"
        ));
    }

    #[test]
    fn test_valid_icon_is_set() {
        let host = RecordingHost::new();
        let profile = Profile::new("w").with_icon("https://example.com/icon.png");
        open_panel(&profile, &ConnectorOptions::default(), &local(), &host).unwrap();
        assert_eq!(
            host.last_panel().unwrap().icon().unwrap().as_str(),
            "https://example.com/icon.png"
        );
        assert!(host.notices().is_empty());
    }
}
