//! Built-in demo frame: a textured floor, a translucent panel and a shadow
//! volume cast onto the floor.

use ember3d_raster::scene::{attr, clear_attr1, Polygon, PolygonFlags, PolygonVertex, RenderRegisters, Vertex};
use ember3d_raster::texture::{bits, pack, TexFormat, VramSnapshot, TEXTURE_BANK_SIZE};

const CHECKER_SIZE_LOG: u32 = 1; // 16×16

const PANEL_ID: u32 = 2;
const SHADOW_ID: u32 = 7;
const FLOOR_ID: u32 = 1;

/// Frame data owned for the lifetime of the render.
pub struct DemoScene {
    pub polygons: Vec<Polygon>,
    pub vertices: Vec<Vertex>,
    pub regs: RenderRegisters,
    pub bank0: Vec<u8>,
}

impl DemoScene {
    pub fn build() -> Self {
        let mut scene = Self {
            polygons: Vec::new(),
            vertices: Vec::new(),
            regs: RenderRegisters { clear_attr1: clear_attr1([6, 12, 24], 31, 0), ..Default::default() },
            bank0: checker_texture(),
        };

        // Floor: farther at the top edge, so W grows there.
        let tex_param = pack(TexFormat::Direct, 0, CHECKER_SIZE_LOG, CHECKER_SIZE_LOG) | bits::REPEAT_S | bits::REPEAT_T;
        let floor = [
            (Vertex::at(0, 100).texel(0, 0), 0x9000, 0x4000),
            (Vertex::at(256, 100).texel(128, 0), 0x9000, 0x4000),
            (Vertex::at(256, 192).texel(128, 64), 0x7000, 0x1000),
            (Vertex::at(0, 192).texel(0, 64), 0x7000, 0x1000),
        ];
        let mut p = scene.polygon(&floor);
        p.attr = attr::pack(0, 31, FLOOR_ID);
        p.tex_param = tex_param;
        scene.polygons.push(p);

        let panel = scene.rect([40, 24, 168, 120], [4, 10, 31], 0x5000);
        scene.polygons.push(Polygon {
            attr: attr::pack(0, 14, PANEL_ID),
            flags: PolygonFlags::TRANSLUCENT,
            ..panel
        });

        // Shadow volume: back face behind the floor marks, front face darkens.
        let back = scene.rect([150, 130, 230, 180], [0, 0, 0], 0xA000);
        scene.polygons.push(Polygon {
            attr: attr::pack(3, 1, 0),
            flags: PolygonFlags::TRANSLUCENT | PolygonFlags::SHADOW_MASK,
            ..back
        });
        let front = scene.rect([150, 130, 230, 180], [0, 0, 0], 0x6000);
        scene.polygons.push(Polygon {
            attr: attr::pack(3, 20, SHADOW_ID),
            flags: PolygonFlags::TRANSLUCENT | PolygonFlags::SHADOW,
            ..front
        });

        scene
    }

    pub fn vram(&self) -> VramSnapshot<'_> {
        VramSnapshot { texture_banks: [Some(&self.bank0), None, None, None], ..Default::default() }
    }

    fn polygon(&mut self, corners: &[(Vertex, u32, u32)]) -> Polygon {
        let base = self.vertices.len() as u16;
        self.vertices.extend(corners.iter().map(|(v, ..)| *v));
        let vertices = (0u16..)
            .zip(corners)
            .map(|(i, &(_, z, w))| PolygonVertex { vertex: base + i, z, w })
            .collect();
        Polygon { vertices, ..Default::default() }
    }

    fn rect(&mut self, [x0, y0, x1, y1]: [i32; 4], rgb: [u8; 3], z: u32) -> Polygon {
        let corners = [(x0, y0), (x1, y0), (x1, y1), (x0, y1)]
            .map(|(x, y)| (Vertex::at(x, y).rgb5(rgb[0], rgb[1], rgb[2]), z, 0x1000));
        self.polygon(&corners)
    }
}

/// 16×16 direct-color checkerboard of 4×4 squares at the start of bank 0.
fn checker_texture() -> Vec<u8> {
    let mut bank = vec![0u8; TEXTURE_BANK_SIZE];
    let light: u16 = 0x8000 | 28 | (26 << 5) | (20 << 10);
    let dark: u16 = 0x8000 | 10 | (7 << 5) | (5 << 10);
    for (i, texel) in bank[..16 * 16 * 2].chunks_exact_mut(2).enumerate() {
        let (s, t) = (i % 16, i / 16);
        let c = if (s / 4 + t / 4) % 2 == 0 { light } else { dark };
        texel.copy_from_slice(&c.to_le_bytes());
    }
    bank
}
