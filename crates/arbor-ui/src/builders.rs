use std::sync::Arc;

use arbor_engine::Result;
use arbor_engine::core::{SetupCtx, System};
use arbor_engine::resource::{Resource, ResourceRegistry, Texture};
use arbor_engine::scene::{Component, ComponentBuilders};
use log::{debug, info};

use crate::actions::UiActions;
use crate::controller::Controller;
use crate::mask::MaskComponent;
use crate::rect_transform::{RectTransform, RectTransformData};
use crate::style::Styles;
use crate::widgets::{Button, ButtonData, Panel, PanelData};

/// Shared services UI components are built with.
#[derive(Clone)]
pub struct UiEnv {
    pub styles: Arc<Styles>,
    pub actions: UiActions,
    pub textures: Arc<ResourceRegistry<Texture>>,
}

impl UiEnv {
    /// Default styles and a fresh action queue.
    pub fn new(textures: Arc<ResourceRegistry<Texture>>) -> Self {
        Self { styles: Arc::new(Styles::default()), actions: UiActions::new(), textures }
    }

    /// Builds a panel from its serialized form, resolving the texture by name.
    pub fn panel(&self, data: PanelData) -> Result<Panel> {
        let panel = match &data.texture {
            Some(name) => Panel::textured(self.textures.link(name)?),
            None => Panel::new(self.styles.current().background_color),
        };
        let panel = match data.color {
            Some(color) => panel.tint(color),
            None => panel,
        };
        Ok(panel.draggable(data.draggable))
    }

    pub fn button(&self, data: ButtonData) -> Button {
        Button::new(data.action, self.styles.clone(), self.actions.clone()).disabled(data.disabled)
    }
}

/// Component tags bound by [`register_builders`].
pub const TAGS: [&str; 5] = ["ui.controller", "ui.rect_transform", "ui.mask", "ui.panel", "ui.button"];

fn boxed(component: impl Component) -> Result<Box<dyn Component>> {
    Ok(Box::new(component))
}

/// Binds every UI component tag. Fails on the first tag already taken.
pub fn register_builders(builders: &mut ComponentBuilders, env: &UiEnv) -> Result<()> {
    builders.register("ui.controller", |_| boxed(Controller::new()))?;
    builders.register("ui.mask", |_| boxed(MaskComponent::new()))?;
    builders.register_typed("ui.rect_transform", |data: Option<RectTransformData>| {
        boxed(RectTransform::from(data.unwrap_or_default()))
    })?;

    let ui = env.clone();
    builders.register_typed("ui.panel", move |data: Option<PanelData>| boxed(ui.panel(data.unwrap_or_default())?))?;

    let ui = env.clone();
    builders.register_typed("ui.button", move |data: ButtonData| boxed(ui.button(data)))?;

    debug!("ui: registered {} component builders", TAGS.len());
    Ok(())
}

/// Installs the UI builders during engine setup.
///
/// The texture registry is taken from the engine's resources, so panels can
/// reference any texture loaded before a scene is built.
pub struct UiSystem {
    styles: Arc<Styles>,
    actions: UiActions,
    env: Option<UiEnv>,
}

impl UiSystem {
    pub const NAME: &'static str = "ui";

    pub fn new(styles: Arc<Styles>, actions: UiActions) -> Self {
        Self { styles, actions, env: None }
    }

    /// Builder services, once set up.
    pub fn env(&self) -> Option<&UiEnv> {
        self.env.as_ref()
    }
}

impl System for UiSystem {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn setup(&mut self, ctx: &mut SetupCtx<'_>) -> Result<()> {
        let textures = ctx.resources.registry::<Texture>(Texture::KIND)?;
        let env = UiEnv { styles: self.styles.clone(), actions: self.actions.clone(), textures };
        register_builders(ctx.builders, &env)?;
        self.env = Some(env);
        info!("ui: ready");
        Ok(())
    }

    fn teardown(&mut self, _ctx: &mut SetupCtx<'_>) {
        self.env = None;
    }
}

#[cfg(test)]
mod tests {
    use arbor_engine::coords::Vec2;
    use arbor_engine::device::{GpuAllocator, HeadlessGpu, TextureFormat};
    use arbor_engine::error::Error;
    use arbor_engine::identity::IdentityRegistry;
    use arbor_engine::resource::Resources;

    use super::*;

    struct Fixture {
        ids: Arc<IdentityRegistry>,
        gpu: Arc<HeadlessGpu>,
        env: UiEnv,
        builders: ComponentBuilders,
    }

    fn fixture() -> Fixture {
        let ids = Arc::new(IdentityRegistry::new());
        let gpu = Arc::new(HeadlessGpu::new());
        let textures = Arc::new(ResourceRegistry::<Texture>::new(ids.clone(), gpu.clone()));
        let logo = Texture::from_pixels("logo", 2, 2, TextureFormat::Rgba8, vec![255; 16]).unwrap();
        textures.register("logo", logo).unwrap();

        let env = UiEnv::new(textures);
        let mut builders = ComponentBuilders::new();
        register_builders(&mut builders, &env).unwrap();
        Fixture { ids, gpu, env, builders }
    }

    const MENU: &str = r#"{
        "name": "menu",
        "objects": [{
            "name": "ui",
            "components": [{ "type": "ui.rect_transform" }, { "type": "ui.controller" }],
            "objects": [
                {
                    "name": "viewport",
                    "components": [
                        { "type": "ui.rect_transform", "data": { "anchor": "stretch_all", "size": [-8, -8] } },
                        { "type": "ui.mask" }
                    ],
                    "objects": [{
                        "name": "logo",
                        "components": [
                            { "type": "ui.rect_transform", "data": { "size": [64, 64] } },
                            { "type": "ui.panel", "data": { "texture": "logo", "draggable": true } }
                        ]
                    }]
                },
                {
                    "name": "play",
                    "components": [
                        { "type": "ui.rect_transform", "data": { "position": [10, 10], "size": [80, 20] } },
                        { "type": "ui.button", "data": { "action": "play" } }
                    ]
                }
            ]
        }]
    }"#;

    #[test]
    fn builds_a_menu_scene() {
        let f = fixture();
        let gpu: Arc<dyn GpuAllocator> = f.gpu.clone();
        let scene = f.builders.build_scene(MENU.as_bytes(), f.ids.clone(), gpu).unwrap();
        let graph = scene.graph();

        assert_eq!(graph.len(), 4);
        assert_eq!(graph.component_count(), 8);

        let logo = graph.find("logo").unwrap();
        let panel = graph.get::<Panel>(logo).unwrap();
        assert_eq!(panel.texture().unwrap().name(), "logo");

        let play = graph.find("play").unwrap();
        assert_eq!(graph.get::<Button>(play).unwrap().action(), "play");
        assert_eq!(graph.transform(play).unwrap().size(), Vec2::new(80.0, 20.0));
        assert!(graph.get::<Controller>(graph.find("ui").unwrap()).is_some());
    }

    #[test]
    fn unknown_texture_aborts_the_build() {
        let f = fixture();
        let doc = MENU.replace(r#""texture": "logo""#, r#""texture": "missing""#);
        let gpu: Arc<dyn GpuAllocator> = f.gpu.clone();

        let err = f.builders.build_scene(doc.as_bytes(), f.ids.clone(), gpu).unwrap_err();
        let Error::Build { path, .. } = &err else {
            panic!("expected build error, got {err:?}");
        };
        assert_eq!(path, "ui/viewport/logo");
        assert!(matches!(err.root_cause(), Error::NotFound { kind: "texture", .. }));
        // only the texture's own identifier is still live
        assert_eq!(f.ids.len(), 1);
    }

    #[test]
    fn button_without_action_is_rejected() {
        let f = fixture();
        assert!(f.builders.build("ui.button", b"null").is_err());
        assert!(f.builders.build("ui.button", br#"{ "action": "quit" }"#).is_ok());
    }

    #[test]
    fn plain_panel_uses_style_background() {
        let f = fixture();
        let panel = f.env.panel(PanelData::default()).unwrap();
        assert_eq!(panel.color(), f.env.styles.current().background_color);
        assert!(!panel.is_textured());
    }

    #[test]
    fn second_registration_fails() {
        let mut f = fixture();
        let env = f.env.clone();
        assert!(matches!(register_builders(&mut f.builders, &env), Err(Error::AlreadyExists { .. })));
    }

    #[test]
    fn system_registers_builders_at_setup() {
        let ids = Arc::new(IdentityRegistry::new());
        let gpu: Arc<dyn GpuAllocator> = Arc::new(HeadlessGpu::new());
        let resources = Resources::new();
        resources.insert(Arc::new(ResourceRegistry::<Texture>::new(ids.clone(), gpu.clone()))).unwrap();
        let mut builders = ComponentBuilders::new();

        let mut system = UiSystem::new(Arc::new(Styles::default()), UiActions::new());
        let mut ctx = SetupCtx { ids: &ids, gpu: &gpu, resources: &resources, builders: &mut builders };
        system.setup(&mut ctx).unwrap();

        assert!(system.env().is_some());
        assert!(TAGS.iter().all(|t| builders.contains(t)));
    }
}
