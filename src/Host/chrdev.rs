use std::collections::HashMap;
use std::fmt;
use std::io;
use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;

use crate::Core::error::{DamageError, Result};
use crate::Damage::device::{DamageDevice, DamageFile, OpenFlags};

const MINORBITS: u32 = 20;
const MINORMASK: u32 = (1 << MINORBITS) - 1;

/// First major handed out by dynamic allocation; counts down like `alloc_chrdev_region`.
const DYNAMIC_MAJOR_START: u32 = 254;
const DYNAMIC_MAJOR_END: u32 = 234;

/// Device number, `MKDEV(major, minor)`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DevT(u32);

impl DevT {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self((major << MINORBITS) | (minor & MINORMASK))
    }

    pub const fn major(self) -> u32 {
        self.0 >> MINORBITS
    }

    pub const fn minor(self) -> u32 {
        self.0 & MINORMASK
    }
}

impl fmt::Debug for DevT {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.major(), self.minor())
    }
}

/// Character-device plumbing the damage module registers with.
///
/// Registration is not atomic across these steps; callers unwind on partial failure.
pub trait DeviceRegistry: Send + Sync {
    /// Reserve a device number under `name` (`alloc_chrdev_region`).
    fn alloc_region(&self, name: &str) -> io::Result<DevT>;

    /// Give the device number back (`unregister_chrdev_region`).
    fn release_region(&self, dev: DevT);

    /// Publish `device` as `/dev/<name>` in `class`, creating the class on first use.
    fn create_node(
        &self,
        class: &str,
        name: &str,
        dev: DevT,
        device: Arc<DamageDevice>,
    ) -> io::Result<()>;

    /// Remove the node bound to `dev`, destroying `class` once it is empty.
    fn destroy_node(&self, class: &str, dev: DevT);
}

struct Node {
    dev: DevT,
    class: String,
    device: Arc<DamageDevice>,
}

#[derive(Default)]
struct Tables {
    regions: HashMap<DevT, String>,
    nodes: HashMap<String, Node>,
    classes: HashMap<String, usize>,
}

/// In-memory `/dev`: device numbers, classes and nodes, openable by name.
#[derive(Default)]
pub struct NodeTable {
    tables: Mutex<Tables>,
}

impl NodeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a node by name (`fbdamage` or `/dev/fbdamage`).
    pub fn open(&self, path: &str, flags: OpenFlags) -> Result<DamageFile> {
        let name = path.strip_prefix("/dev/").unwrap_or(path);
        let device = {
            let tables = self.tables.lock();
            let node = tables.nodes.get(name).ok_or_else(|| {
                DamageError::Io(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no such device node: /dev/{name}"),
                ))
            })?;
            Arc::clone(&node.device)
        };
        DamageDevice::open(&device, flags)
    }

    pub fn has_node(&self, name: &str) -> bool {
        self.tables.lock().nodes.contains_key(name)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.tables.lock().classes.contains_key(class)
    }

    pub fn node_dev(&self, name: &str) -> Option<DevT> {
        self.tables.lock().nodes.get(name).map(|n| n.dev)
    }

    /// Number of device numbers currently reserved.
    pub fn region_count(&self) -> usize {
        self.tables.lock().regions.len()
    }
}

impl DeviceRegistry for NodeTable {
    fn alloc_region(&self, name: &str) -> io::Result<DevT> {
        let mut tables = self.tables.lock();
        let major = (DYNAMIC_MAJOR_END..=DYNAMIC_MAJOR_START)
            .rev()
            .find(|&major| !tables.regions.keys().any(|d| d.major() == major))
            .ok_or_else(|| io::Error::from_raw_os_error(libc::EBUSY))?;
        let dev = DevT::new(major, 0);
        tables.regions.insert(dev, name.to_owned());
        debug!("allocated chrdev region {dev:?} for {name}");
        Ok(dev)
    }

    fn release_region(&self, dev: DevT) {
        if let Some(name) = self.tables.lock().regions.remove(&dev) {
            debug!("released chrdev region {dev:?} ({name})");
        }
    }

    fn create_node(
        &self,
        class: &str,
        name: &str,
        dev: DevT,
        device: Arc<DamageDevice>,
    ) -> io::Result<()> {
        let mut tables = self.tables.lock();
        if !tables.regions.contains_key(&dev) {
            return Err(io::Error::from_raw_os_error(libc::ENXIO));
        }
        if tables.nodes.contains_key(name) {
            return Err(io::Error::from_raw_os_error(libc::EEXIST));
        }
        *tables.classes.entry(class.to_owned()).or_insert(0) += 1;
        tables.nodes.insert(
            name.to_owned(),
            Node {
                dev,
                class: class.to_owned(),
                device,
            },
        );
        debug!("created /dev/{name} ({dev:?}) in class {class}");
        Ok(())
    }

    fn destroy_node(&self, class: &str, dev: DevT) {
        let mut tables = self.tables.lock();
        let name = tables
            .nodes
            .iter()
            .find(|(_, node)| node.dev == dev && node.class == class)
            .map(|(name, _)| name.clone());
        let Some(name) = name else {
            return;
        };
        tables.nodes.remove(&name);
        if let Some(users) = tables.classes.get_mut(class) {
            *users -= 1;
            if *users == 0 {
                tables.classes.remove(class);
            }
        }
        debug!("destroyed /dev/{name} ({dev:?})");
    }
}
