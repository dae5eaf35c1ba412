//! Command-line options and pipeline-description assembly.

use std::path::PathBuf;

use clap::{Arg, ArgAction, Command};
use thiserror::Error;

use crate::pipeline::VIDEO_SINK_ELEMENT;

/// Element name the shader fragment program is set on.
pub const SHADER_ELEMENT: &str = "customshader";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("graph does not reference the {VIDEO_SINK_ELEMENT} element")]
    GraphMissingSink,
    #[error("cannot read shader file {}: {source}", path.display())]
    ShaderUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Parsed command line.
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub no_fullscreen: bool,
    pub graph: Option<String>,
    pub shader: Option<PathBuf>,
    pub uris: Vec<String>,
}

impl Options {
    pub fn from_cli() -> Self {
        let matches = Command::new("tapdeck")
            .version(env!("CARGO_PKG_VERSION"))
            .about(env!("CARGO_PKG_DESCRIPTION"))
            .arg(
                Arg::new("no-fullscreen")
                    .short('F')
                    .long("no-fullscreen")
                    .help("Do not put video on fullscreen")
                    .action(ArgAction::SetTrue),
            )
            .arg(
                Arg::new("graph")
                    .long("graph")
                    .value_name("DESCRIPTION")
                    .help("Custom pipeline description to launch"),
            )
            .arg(
                Arg::new("shader")
                    .long("shader")
                    .value_name("FILE")
                    .help("Fragment shader applied to camera capture"),
            )
            .arg(
                Arg::new("uri")
                    .value_name("URI")
                    .num_args(0..)
                    .help("Media URIs; more than one loops through them"),
            )
            .get_matches();

        Self {
            no_fullscreen: matches.get_flag("no-fullscreen"),
            graph: matches.get_one::<String>("graph").cloned(),
            shader: matches.get_one::<String>("shader").map(PathBuf::from),
            uris: matches
                .get_many::<String>("uri")
                .map(|values| values.cloned().collect())
                .unwrap_or_default(),
        }
    }
}

/// What to launch: the engine description plus everything the driver
/// needs to finish wiring it.
#[derive(Debug, Clone)]
pub struct LaunchPlan {
    pub description: String,
    /// Raise to playing as soon as the engine is ready.
    pub autoplay: bool,
    pub playlist: Vec<String>,
    /// Fragment program for the shader element, loaded whole.
    pub shader_program: Option<String>,
}

impl LaunchPlan {
    /// Resolve options into a launch plan. Precedence mirrors the CLI
    /// contract: URIs, then --graph, then --shader, then the built-in
    /// test pattern.
    pub fn resolve(options: &Options) -> Result<LaunchPlan, ConfigError> {
        if !options.uris.is_empty() {
            let sink = if options.no_fullscreen {
                VIDEO_SINK_ELEMENT.to_string()
            } else {
                format!("{VIDEO_SINK_ELEMENT} fullscreen=true")
            };
            return Ok(LaunchPlan {
                description: format!("playbin video-sink='{sink}'"),
                autoplay: true,
                playlist: options.uris.clone(),
                shader_program: None,
            });
        }

        if let Some(graph) = &options.graph {
            if !graph.contains(VIDEO_SINK_ELEMENT) {
                return Err(ConfigError::GraphMissingSink);
            }
            return Ok(LaunchPlan {
                description: graph.clone(),
                autoplay: true,
                playlist: Vec::new(),
                shader_program: None,
            });
        }

        if let Some(path) = &options.shader {
            let program =
                std::fs::read_to_string(path).map_err(|source| ConfigError::ShaderUnreadable {
                    path: path.clone(),
                    source,
                })?;
            return Ok(LaunchPlan {
                description: shader_graph(),
                autoplay: true,
                playlist: Vec::new(),
                shader_program: Some(program),
            });
        }

        Ok(LaunchPlan {
            description: format!("testsrc pattern=smpte ! {VIDEO_SINK_ELEMENT} fullscreen=true"),
            autoplay: false,
            playlist: Vec::new(),
            shader_program: None,
        })
    }
}

/// Camera capture run through a user shader. Capture and shader rates are
/// throttled so the fragment program stays cheap on embedded targets.
fn shader_graph() -> String {
    format!(
        "camerasrc ! video/raw,format=YUY2,width=320,height=240,framerate=15/1 \
         ! ratelimit framerate=5/1 ! queue ! convert format=RGBA ! queue \
         ! shader name={SHADER_ELEMENT} ! queue ! convert ! queue \
         ! {VIDEO_SINK_ELEMENT} sync=false fullscreen=true"
    )
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn uris_launch_a_player_with_playlist() {
        let options = Options {
            uris: vec!["file:///a.webm".into(), "file:///b.webm".into()],
            ..Options::default()
        };
        let plan = LaunchPlan::resolve(&options).unwrap();
        assert!(plan.description.starts_with("playbin"));
        assert!(plan.description.contains("fullscreen=true"));
        assert!(plan.autoplay);
        assert_eq!(plan.playlist.len(), 2);
    }

    #[test]
    fn no_fullscreen_player_omits_fullscreen_sink_option() {
        let options = Options {
            no_fullscreen: true,
            uris: vec!["file:///a.webm".into()],
            ..Options::default()
        };
        let plan = LaunchPlan::resolve(&options).unwrap();
        assert!(!plan.description.contains("fullscreen=true"));
    }

    #[test]
    fn graph_must_reference_the_video_sink() {
        let options = Options {
            graph: Some("testsrc ! fakesink".into()),
            ..Options::default()
        };
        assert!(matches!(
            LaunchPlan::resolve(&options),
            Err(ConfigError::GraphMissingSink)
        ));
    }

    #[test]
    fn valid_graph_passes_through_unchanged() {
        let graph = "filesrc location=/tmp/clip ! decode ! videosink";
        let options = Options {
            graph: Some(graph.into()),
            ..Options::default()
        };
        let plan = LaunchPlan::resolve(&options).unwrap();
        assert_eq!(plan.description, graph);
        assert!(plan.autoplay);
    }

    #[test]
    fn missing_shader_file_is_rejected() {
        let options = Options {
            shader: Some(PathBuf::from("/nonexistent/frag.glsl")),
            ..Options::default()
        };
        assert!(matches!(
            LaunchPlan::resolve(&options),
            Err(ConfigError::ShaderUnreadable { .. })
        ));
    }

    #[test]
    fn shader_file_is_loaded_whole() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let program = "precision mediump float;\nvoid main() {\n}\n";
        file.write_all(program.as_bytes()).unwrap();

        let options = Options {
            shader: Some(file.path().to_path_buf()),
            ..Options::default()
        };
        let plan = LaunchPlan::resolve(&options).unwrap();
        assert_eq!(plan.shader_program.as_deref(), Some(program));
        assert!(plan.description.contains(SHADER_ELEMENT));
    }

    #[test]
    fn bare_invocation_uses_the_test_pattern() {
        let plan = LaunchPlan::resolve(&Options::default()).unwrap();
        assert!(plan.description.contains("testsrc"));
        assert!(!plan.autoplay);
        assert!(plan.playlist.is_empty());
    }
}
