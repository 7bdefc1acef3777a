//! End-to-end scenarios (§8): one test per scenario, driving handlers the
//! way a call dispatcher would, against the in-memory reference backend.

use wasi_preview1_host::mem_backend::MemDir;
use wasi_preview1_host::memory;
use wasi_preview1_host::snapshot1::{dir, fd_lifecycle, io, poll, preopen, process, stat};
use wasi_preview1_host::types::{ClockId, Oflags, Subclockflags, Subscription, SubscriptionClock, SubscriptionUnion};
use wasi_preview1_host::{Bindings, Errno};

fn write_name(mem: &mut Vec<u8>, ptr: u32, name: &str) {
    memory::write_string(mem, ptr, name, name.len() as u32 + 1).unwrap();
}

#[tokio::test]
async fn hello_write() {
    let mut bindings = Bindings::builder().preopen("/sandbox", Box::new(MemDir::new())).build();
    let mut mem: Vec<u8> = vec![0u8; 512];
    write_name(&mut mem, 0, "hello.txt");

    preopen::path_open(&mut bindings, &mut mem, 3, 0, 0, 9, Oflags::CREATE.bits(), 0, 0, 0, 100)
        .await
        .unwrap();
    let fd = memory::read_u32(&mem, 100).unwrap();

    memory::write_u32(&mut mem, 120, 200).unwrap(); // iov.buf
    memory::write_u32(&mut mem, 124, 2).unwrap(); // iov.len
    memory::write_bytes(&mut mem, 200, b"hi").unwrap();
    io::fd_write(&mut bindings, &mut mem, fd, 120, 1, 128).await.unwrap();
    assert_eq!(memory::read_u32(&mem, 128).unwrap(), 2);

    fd_lifecycle::fd_close(&mut bindings, fd).await.unwrap();

    // Re-open and confirm the write landed.
    write_name(&mut mem, 0, "hello.txt");
    preopen::path_open(&mut bindings, &mut mem, 3, 0, 0, 9, 0, 0, 0, 0, 100).await.unwrap();
    let fd2 = memory::read_u32(&mem, 100).unwrap();
    memory::write_u32(&mut mem, 140, 220).unwrap();
    memory::write_u32(&mut mem, 144, 16).unwrap();
    io::fd_read(&mut bindings, &mut mem, fd2, 140, 1, 148).await.unwrap();
    assert_eq!(memory::read_u32(&mem, 148).unwrap(), 2);
    assert_eq!(&mem[220..222], b"hi");
}

#[tokio::test]
async fn read_back() {
    let root = MemDir::new();
    root.seed_file("input.txt", b"hello from input.txt\n".to_vec());
    let mut bindings = Bindings::builder().preopen("/sandbox", Box::new(root)).build();
    let mut mem: Vec<u8> = vec![0u8; 4096 + 512];
    write_name(&mut mem, 0, "input.txt");

    preopen::path_open(&mut bindings, &mut mem, 3, 0, 0, 9, 0, 0, 0, 0, 100).await.unwrap();
    let fd = memory::read_u32(&mem, 100).unwrap();

    memory::write_u32(&mut mem, 140, 512).unwrap();
    memory::write_u32(&mut mem, 144, 4096).unwrap();
    io::fd_read(&mut bindings, &mut mem, fd, 140, 1, 148).await.unwrap();
    let nread = memory::read_u32(&mem, 148).unwrap();
    assert_eq!(nread, 21);
    assert_eq!(&mem[512..512 + 21], b"hello from input.txt\n");
}

#[tokio::test]
async fn directory_listing_resumption() {
    let root = MemDir::new();
    root.seed_file("a", b"1".to_vec());
    root.seed_file("b", b"2".to_vec());
    root.seed_file("c", b"3".to_vec());
    let mut bindings = Bindings::builder().preopen("/sandbox", Box::new(root)).build();
    let mut mem: Vec<u8> = vec![0u8; 256];

    let fd = 3u32;
    let mut cookie = 0u64;
    let mut seen = Vec::new();
    loop {
        dir::fd_readdir(&mut bindings, &mut mem, fd, 0, 32, cookie, 200).await.unwrap();
        let used = memory::read_u32(&mem, 200).unwrap();
        if used == 0 {
            break;
        }
        let name_len = memory::read_u32(&mem, 16).unwrap();
        let name = String::from_utf8(mem[24..24 + name_len as usize].to_vec()).unwrap();
        seen.push(name);
        cookie = memory::read_u64(&mem, 0).unwrap();
    }
    assert_eq!(seen, vec!["a", "b", "c"]);

    // A fourth call with the cookie one past the last entry reports nothing.
    dir::fd_readdir(&mut bindings, &mut mem, fd, 0, 32, cookie, 200).await.unwrap();
    assert_eq!(memory::read_u32(&mem, 200).unwrap(), 0);
}

#[tokio::test]
async fn escape_denied() {
    let bindings = Bindings::builder().preopen("/sandbox", Box::new(MemDir::new())).build();
    let mut mem: Vec<u8> = vec![0u8; 128];
    write_name(&mut mem, 0, "../etc/passwd");
    let err = stat::path_filestat_get(&bindings, &mut mem, 3, 0, 13, 100).await.unwrap_err();
    assert_eq!(err.errno, Errno::Notcapable);
}

#[tokio::test]
async fn exit_propagation() {
    let exit = process::proc_exit(120).await;
    assert_eq!(exit.code, 120);
}

#[tokio::test]
async fn clock_sleep() {
    let bindings = Bindings::builder().build();
    let mut mem: Vec<u8> = vec![0u8; 256];
    let sub = Subscription {
        userdata: 99,
        u: SubscriptionUnion::Clock(SubscriptionClock {
            id: ClockId::Monotonic,
            timeout: 50_000_000, // 50ms
            precision: 0,
            flags: Subclockflags::empty(),
        }),
    };
    memory::write_u64(&mut mem, 0, sub.userdata).unwrap();
    memory::write_u8(&mut mem, 8, 0).unwrap();
    if let SubscriptionUnion::Clock(ref c) = sub.u {
        memory::write_u32(&mut mem, 16, c.id as u32).unwrap();
        memory::write_u64(&mut mem, 24, c.timeout).unwrap();
        memory::write_u64(&mut mem, 32, c.precision).unwrap();
        memory::write_u16(&mut mem, 40, c.flags.bits()).unwrap();
    }

    let started = std::time::Instant::now();
    poll::poll_oneoff(&bindings, &mut mem, 0, 100, 1, 200).await.unwrap();
    assert!(started.elapsed() >= std::time::Duration::from_millis(40));
    assert_eq!(memory::read_u32(&mem, 200).unwrap(), 1);
    assert_eq!(memory::read_u64(&mem, 100).unwrap(), 99);
}
