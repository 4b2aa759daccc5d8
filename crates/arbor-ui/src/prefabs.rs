//! Ready-made node trees.

use arbor_engine::Result;
use arbor_engine::coords::Vec2;
use arbor_engine::identity::ObjectId;
use arbor_engine::resource::{ResourceLink, Texture};
use arbor_engine::scene::{Component, SceneGraph};
use log::debug;

use crate::builders::UiEnv;
use crate::controller::Controller;
use crate::rect_transform::{AnchorPreset, PivotPreset, RectTransform};
use crate::widgets::Panel;

/// A node with a layout rect and `components`, under `parent`.
///
/// The node is destroyed again if any component cannot be attached.
pub fn object(
    graph: &mut SceneGraph,
    name: &str,
    parent: Option<ObjectId>,
    rect: RectTransform,
    components: Vec<Box<dyn Component>>,
) -> Result<ObjectId> {
    let node = graph.spawn(name, parent)?;
    let attached = std::iter::once(Box::new(rect) as Box<dyn Component>)
        .chain(components)
        .try_for_each(|c| graph.add_component(node, c).map(drop));
    if let Err(e) = attached {
        let _ = graph.destroy(node);
        return Err(e);
    }
    Ok(node)
}

/// A root node driving a [`Controller`]. Its rect tracks the viewport.
pub fn controller(graph: &mut SceneGraph, name: &str) -> Result<ObjectId> {
    object(graph, name, None, RectTransform::new(), vec![Box::new(Controller::new())])
}

/// Full-screen backdrop in the style background color with the texture
/// `logo` centered on it at its natural size.
///
/// Returns the controller node. Nothing is left in the graph on failure.
pub fn splash(graph: &mut SceneGraph, env: &UiEnv, logo: &str) -> Result<ObjectId> {
    let (width, height) = env.textures.get(logo)?.size();
    let texture = env.textures.link(logo)?;

    let root = controller(graph, "splash")?;
    if let Err(e) = splash_children(graph, env, root, texture, Vec2::new(width as f32, height as f32)) {
        let _ = graph.destroy(root);
        return Err(e);
    }
    debug!("prefabs: built splash around '{logo}'");
    Ok(root)
}

fn splash_children(
    graph: &mut SceneGraph,
    env: &UiEnv,
    root: ObjectId,
    logo: ResourceLink<Texture>,
    logo_size: Vec2,
) -> Result<()> {
    let backdrop = object(
        graph,
        "splash.background",
        Some(root),
        RectTransform::new().with_anchor(AnchorPreset::StretchAll),
        vec![Box::new(Panel::new(env.styles.current().background_color))],
    )?;
    object(
        graph,
        "splash.logo",
        Some(backdrop),
        RectTransform::new()
            .with_anchor(AnchorPreset::MiddleCenter)
            .with_pivot(PivotPreset::MiddleCenter)
            .with_size(logo_size),
        vec![Box::new(Panel::textured(logo))],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arbor_engine::coords::{Rect, Viewport};
    use arbor_engine::device::{GpuAllocator, HeadlessGpu, TextureFormat};
    use arbor_engine::identity::IdentityRegistry;
    use arbor_engine::input::{InputFrame, InputState};
    use arbor_engine::render::{RenderCmd, RenderList};
    use arbor_engine::resource::ResourceRegistry;
    use arbor_engine::scene::{FrameEnv, FrameInfo, Scene};

    use super::*;

    fn setup() -> (Arc<HeadlessGpu>, SceneGraph, UiEnv) {
        let ids = Arc::new(IdentityRegistry::new());
        let gpu = Arc::new(HeadlessGpu::new());
        let textures = Arc::new(ResourceRegistry::<Texture>::new(ids.clone(), gpu.clone()));
        let logo = Texture::from_pixels("logo", 40, 20, TextureFormat::Rgba8, vec![0; 40 * 20 * 4]).unwrap();
        textures.register("logo", logo).unwrap();
        (gpu.clone(), SceneGraph::new(ids, gpu), UiEnv::new(textures))
    }

    #[test]
    fn splash_centers_logo_over_backdrop() {
        let (_gpu, graph, env) = setup();
        let mut scene = Scene::new("splash", graph);
        splash(scene.graph_mut(), &env, "logo").unwrap();

        let input = InputState::new(Viewport::new(200.0, 100.0));
        let edges = InputFrame::default();
        let mut render = RenderList::new();
        let mut frame = FrameEnv { time: FrameInfo::default(), input: &input, edges: &edges, render: &mut render };
        scene.update(&mut frame);
        scene.render(&mut frame);

        let quads: Vec<Rect> = render
            .commands()
            .iter()
            .filter_map(|c| match c {
                RenderCmd::Quad { rect, .. } => Some(*rect),
                _ => None,
            })
            .collect();
        assert_eq!(quads, vec![Rect::new(0.0, 0.0, 200.0, 100.0), Rect::new(80.0, 40.0, 40.0, 20.0)]);
    }

    #[test]
    fn missing_logo_leaves_graph_empty() {
        let (gpu, mut graph, env) = setup();
        assert!(splash(&mut graph, &env, "nope").is_err());
        assert!(graph.is_empty());
        assert_eq!(gpu.live(), 1);
    }

    #[test]
    fn controller_prefab_is_a_root_with_rect_and_script() {
        let (_gpu, mut graph, _env) = setup();
        let node = controller(&mut graph, "hud").unwrap();
        assert_eq!(graph.roots(), &[node]);
        assert!(graph.transform(node).is_some());
        assert!(graph.get::<Controller>(node).is_some());
    }
}
