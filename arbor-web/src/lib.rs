/// Arbor Web - browser shell for the wisdom tree
///
/// Owns the scroll container, the canvas element and the wheel listener, and
/// hands the per-frame scene to JavaScript as flat arrays for whatever
/// renderer draws the canvas.
use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlCanvasElement, HtmlElement};

use arbor_core::config::{INSTRUCTIONS, TREE_LEVELS};
use arbor_core::material::Light;
use arbor_core::viewport::bind_scroll;
use arbor_core::{
    Camera, MeshRole, NodeContent, SceneLoader, ScrollTarget, TreeScene, WheelEvent, WheelRouter,
    WheelSubscription,
};

type Style = &'static [(&'static str, &'static str)];

const CONTAINER_STYLE: Style = &[
    ("width", "100%"),
    ("height", "100vh"),
    ("overflow-y", "auto"),
    ("background", "black"),
    ("scrollbar-width", "none"),
    ("scroll-snap-type", "y mandatory"),
    ("-webkit-overflow-scrolling", "touch"),
];

const SPACER_STYLE: Style = &[("height", "200vh")];

const CANVAS_STYLE: Style = &[
    ("position", "fixed"),
    ("top", "0"),
    ("left", "0"),
    ("width", "100%"),
    ("height", "100%"),
];

const LOADER_STYLE: Style = &[
    ("position", "fixed"),
    ("top", "50%"),
    ("left", "50%"),
    ("transform", "translate(-50%, -50%)"),
    ("color", "white"),
    ("font-family", "monospace"),
];

const INSTRUCTIONS_STYLE: Style = &[
    ("position", "fixed"),
    ("bottom", "1rem"),
    ("left", "1rem"),
    ("color", "white"),
    ("font-size", "0.875rem"),
    ("background", "rgba(0, 0, 0, 0.5)"),
    ("padding", "0.5rem"),
    ("border-radius", "0.25rem"),
];

fn to_js(err: arbor_core::Error) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn apply_styles(element: &HtmlElement, style: Style) -> Result<(), JsValue> {
    let css = element.style();
    for (property, value) in style {
        css.set_property(property, value)?;
    }
    Ok(())
}

fn create(document: &Document, tag: &str, style: Style) -> Result<HtmlElement, JsValue> {
    let element: HtmlElement = document.create_element(tag)?.dyn_into()?;
    apply_styles(&element, style)?;
    Ok(element)
}

/// Stable numeric code for a mesh role, as exported to JavaScript
pub fn role_code(role: MeshRole) -> u8 {
    match role {
        MeshRole::Trunk => 0,
        MeshRole::Leaf => 1,
        MeshRole::CrownLeaf => 2,
        MeshRole::Vein => 3,
        MeshRole::Vine => 4,
        MeshRole::Ground => 5,
    }
}

/// Whole-pixel scroll position, as the DOM exposes `scrollTop`
trait PixelScroll {
    fn scroll_top(&self) -> i32;
    fn set_scroll_top(&self, value: i32);
}

impl PixelScroll for Element {
    fn scroll_top(&self) -> i32 {
        Element::scroll_top(self)
    }

    fn set_scroll_top(&self, value: i32) {
        Element::set_scroll_top(self, value)
    }
}

/// The container's native scroll position as a scroll target.
///
/// `scrollTop` only holds whole pixels, so the fractional part of the
/// requested offset is carried here until it adds up.
struct ElementScroll<E: PixelScroll = Element> {
    element: E,
    remainder: f32,
}

impl<E: PixelScroll> ElementScroll<E> {
    fn new(element: E) -> Self {
        Self {
            element,
            remainder: 0.0,
        }
    }
}

impl<E: PixelScroll> ScrollTarget for ElementScroll<E> {
    fn scroll_offset(&self) -> f32 {
        self.element.scroll_top() as f32 + self.remainder
    }

    // The browser clamps scrollTop to the content range.
    fn set_scroll_offset(&mut self, offset: f32) {
        let whole = offset.floor();
        self.element.set_scroll_top(whole as i32);
        self.remainder = if self.element.scroll_top() == whole as i32 {
            offset - whole
        } else {
            0.0 // clamped
        };
    }
}

/// DOM wheel listener, removed again when dropped
struct WheelListener {
    target: Element,
    closure: Closure<dyn FnMut(web_sys::WheelEvent)>,
}

impl WheelListener {
    fn attach(target: &Element, router: Rc<WheelRouter>) -> Result<Self, JsValue> {
        let closure = Closure::<dyn FnMut(web_sys::WheelEvent)>::new(
            move |event: web_sys::WheelEvent| {
                router.dispatch(WheelEvent {
                    delta_y: event.delta_y() as f32,
                });
            },
        );
        target.add_event_listener_with_callback("wheel", closure.as_ref().unchecked_ref())?;
        Ok(Self {
            target: target.clone(),
            closure,
        })
    }
}

impl Drop for WheelListener {
    fn drop(&mut self) {
        let removed = self
            .target
            .remove_event_listener_with_callback("wheel", self.closure.as_ref().unchecked_ref());
        if removed.is_err() {
            log::warn!("failed to remove wheel listener");
        }
    }
}

/// Everything `mount` attached to the page
struct Mounted {
    container: Element,
    canvas: HtmlCanvasElement,
    loader: HtmlElement,
    added: Vec<HtmlElement>,
    _listener: WheelListener,
    _scroll: WheelSubscription,
}

impl Drop for Mounted {
    fn drop(&mut self) {
        for element in &self.added {
            element.remove();
        }
    }
}

/// The wisdom tree scene as seen from JavaScript
#[wasm_bindgen]
pub struct WebScene {
    loader: Option<SceneLoader>,
    scene: Option<TreeScene>,
    camera: Camera,
    width: u32,
    height: u32,
    mounted: Option<Mounted>,
}

#[wasm_bindgen]
impl WebScene {
    #[wasm_bindgen(constructor)]
    pub fn new(width: u32, height: u32) -> Result<WebScene, JsValue> {
        let loader = SceneLoader::new(&TREE_LEVELS).map_err(to_js)?;
        Ok(Self::with_loader(loader, width, height))
    }

    /// Style the container and attach spacer, canvas, loader, instructions
    /// and the wheel listener. Mounting again replaces the previous mount.
    pub fn mount(&mut self, container_id: &str) -> Result<(), JsValue> {
        self.unmount();

        let document = web_sys::window()
            .and_then(|window| window.document())
            .ok_or_else(|| JsValue::from_str("no document available"))?;
        let container: HtmlElement = document
            .get_element_by_id(container_id)
            .ok_or_else(|| JsValue::from_str(&format!("no element with id {container_id:?}")))?
            .dyn_into()?;
        apply_styles(&container, CONTAINER_STYLE)?;

        let spacer = create(&document, "div", SPACER_STYLE)?;
        let canvas: HtmlCanvasElement = document.create_element("canvas")?.dyn_into()?;
        canvas.set_width(self.width);
        canvas.set_height(self.height);
        apply_styles(&canvas, CANVAS_STYLE)?;
        spacer.append_child(&canvas)?;

        let loader = create(&document, "div", LOADER_STYLE)?;
        loader.set_text_content(Some(&format!("{}%", self.progress())));
        if self.is_ready() {
            loader.style().set_property("display", "none")?;
        }

        let instructions = create(&document, "div", INSTRUCTIONS_STYLE)?;
        let text = document.create_element("p")?;
        text.set_text_content(Some(INSTRUCTIONS));
        instructions.append_child(&text)?;

        container.append_child(&spacer)?;
        container.append_child(&loader)?;
        container.append_child(&instructions)?;

        let container: Element = container.into();
        let router = Rc::new(WheelRouter::new());
        let scroll = bind_scroll(
            &router,
            Rc::new(RefCell::new(ElementScroll::new(container.clone()))),
        );
        let listener = WheelListener::attach(&container, router)?;

        self.mounted = Some(Mounted {
            container,
            canvas,
            loader: loader.clone(),
            added: vec![spacer, loader, instructions],
            _listener: listener,
            _scroll: scroll,
        });
        log::info!("mounted into #{}", container_id);
        Ok(())
    }

    /// Detach the wheel listener and remove the mounted elements
    pub fn unmount(&mut self) {
        if self.mounted.take().is_some() {
            log::info!("unmounted");
        }
    }

    /// The canvas element, once mounted
    pub fn canvas(&self) -> Option<HtmlCanvasElement> {
        self.mounted.as_ref().map(|m| m.canvas.clone())
    }

    pub fn scroll_offset(&self) -> f32 {
        self.mounted
            .as_ref()
            .map_or(0.0, |m| m.container.scroll_top() as f32)
    }

    /// Per-frame tick: load one more segment, or sway the leaves
    pub fn frame(&mut self, elapsed_secs: f32) -> Result<(), JsValue> {
        let became_ready = self.advance(elapsed_secs).map_err(to_js)?;
        if let Some(mounted) = &self.mounted {
            if became_ready {
                mounted.loader.style().set_property("display", "none")?;
            } else if !self.is_ready() {
                mounted
                    .loader
                    .set_text_content(Some(&format!("{}%", self.progress())));
            }
        }
        Ok(())
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.camera.set_aspect(width as f32, height as f32);
        if let Some(mounted) = &self.mounted {
            mounted.canvas.set_width(width);
            mounted.canvas.set_height(height);
        }
    }

    pub fn is_ready(&self) -> bool {
        self.scene.is_some()
    }

    /// Loading progress in percent
    pub fn progress(&self) -> u8 {
        match &self.loader {
            Some(loader) => loader.progress().percent(),
            None => 100,
        }
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes().len()
    }

    /// One role code per mesh, see [`role_code`]
    pub fn mesh_roles(&self) -> Vec<u8> {
        self.meshes().iter().map(|m| role_code(m.0)).collect()
    }

    /// Column-major 4x4 world matrices, 16 floats per mesh
    pub fn world_matrices(&self) -> Vec<f32> {
        self.meshes()
            .iter()
            .flat_map(|m| m.1.as_slice().to_vec())
            .collect()
    }

    /// sRGB-encoded RGB, roughness, metalness: 5 floats per mesh
    pub fn materials(&self) -> Vec<f32> {
        let Some(scene) = &self.scene else {
            return Vec::new();
        };
        scene
            .flatten()
            .iter()
            .filter_map(|item| item.mesh())
            .flat_map(|mesh| {
                let m = mesh.material;
                [m.color.r, m.color.g, m.color.b, m.roughness, m.metalness]
            })
            .collect()
    }

    /// Triangle positions of mesh `index` in its local space, 9 floats per triangle
    pub fn mesh_positions(&self, index: usize) -> Vec<f32> {
        self.mesh_vertices(index, |v| [v.position.x, v.position.y, v.position.z])
    }

    pub fn mesh_normals(&self, index: usize) -> Vec<f32> {
        self.mesh_vertices(index, |v| [v.normal.x, v.normal.y, v.normal.z])
    }

    pub fn label_count(&self) -> usize {
        self.scene.as_ref().map_or(0, |s| s.graph().labels().len())
    }

    pub fn label_text(&self, index: usize) -> Option<String> {
        let scene = self.scene.as_ref()?;
        let labels = scene.graph().labels();
        labels
            .get(index)
            .and_then(|item| item.label())
            .map(|label| label.text.clone())
    }

    /// World-space anchor of every label, 3 floats each
    pub fn label_anchors(&self) -> Vec<f32> {
        let Some(scene) = &self.scene else {
            return Vec::new();
        };
        scene
            .graph()
            .labels()
            .iter()
            .flat_map(|item| {
                let anchor = item.world.transform_point(&nalgebra::Point3::origin());
                [anchor.x, anchor.y, anchor.z]
            })
            .collect()
    }

    /// `[ambient, sun_x, sun_y, sun_z, sun_intensity]`
    pub fn lighting(&self) -> Vec<f32> {
        let mut out = vec![0.0; 5];
        if let Some(scene) = &self.scene {
            for light in scene.lights() {
                match *light {
                    Light::Ambient { intensity, .. } => out[0] += intensity,
                    Light::Directional {
                        position,
                        intensity,
                        ..
                    } => {
                        out[1..4].copy_from_slice(&[position.x, position.y, position.z]);
                        out[4] = intensity;
                    }
                }
            }
        }
        out
    }

    /// Column-major view-projection matrix for the current camera
    pub fn view_projection(&self) -> Vec<f32> {
        self.camera.view_projection().as_slice().to_vec()
    }
}

impl WebScene {
    fn with_loader(loader: SceneLoader, width: u32, height: u32) -> Self {
        Self {
            loader: Some(loader),
            scene: None,
            camera: Camera::new(width, height),
            width,
            height,
            mounted: None,
        }
    }

    pub fn scene(&self) -> Option<&TreeScene> {
        self.scene.as_ref()
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Returns true on the frame the scene finishes loading
    fn advance(&mut self, elapsed: f32) -> arbor_core::Result<bool> {
        if let Some(loader) = self.loader.as_mut() {
            if !loader.step()?.is_complete() {
                return Ok(false);
            }
            if let Some(loader) = self.loader.take() {
                let scene = loader.finish()?;
                scene.mount_camera(&mut self.camera);
                self.scene = Some(scene);
                return Ok(true);
            }
        }
        if let Some(scene) = self.scene.as_mut() {
            scene.update(elapsed)?;
        }
        Ok(false)
    }

    fn meshes(&self) -> Vec<(MeshRole, nalgebra::Matrix4<f32>)> {
        let Some(scene) = &self.scene else {
            return Vec::new();
        };
        scene
            .flatten()
            .iter()
            .filter_map(|item| match item.content {
                NodeContent::Mesh(mesh) => Some((mesh.role, item.world)),
                _ => None,
            })
            .collect()
    }

    fn mesh_vertices(
        &self,
        index: usize,
        attribute: impl Fn(&arbor_core::Vertex) -> [f32; 3],
    ) -> Vec<f32> {
        let Some(scene) = &self.scene else {
            return Vec::new();
        };
        let items = scene.flatten();
        let Some(mesh) = items.iter().filter_map(|item| item.mesh()).nth(index) else {
            return Vec::new();
        };
        let attribute = &attribute;
        mesh.geometry
            .triangles
            .iter()
            .flat_map(move |t| t.vertices.iter().flat_map(move |v| attribute(v)))
            .collect()
    }
}

#[wasm_bindgen(start)]
pub fn main() -> Result<(), JsValue> {
    // Setup panic hook for better error messages in browser console
    #[cfg(feature = "panic-hook")]
    console_error_panic_hook::set_once();

    Ok(())
}
