pub mod txt2img;
