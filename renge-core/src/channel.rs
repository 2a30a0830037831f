//! ランデブーチャネル
//!
//! 送信側と受信側が揃うまで双方がブロックする、バッファなしの単一スロット
//! ハンドオフプリミティブ。`send`は対応する`receive`が値を消費するまで
//! 戻りません。

use parking_lot::{Condvar, Mutex};

struct State<T> {
    slot: Option<T>,
    deposits: u64,
    takes: u64,
}

/// バッファなしの同期ハンドオフチャネル
///
/// 1回の転送につき送信側と受信側がちょうど1組対になります。スロットが
/// 埋まっている間、後続の送信側は空くまで待機するため、複数の送信側は
/// 自然に直列化されます。
pub struct RendezvousChannel<T> {
    state: Mutex<State<T>>,
    /// スロットが空いた
    slot_free: Condvar,
    /// スロットに値が置かれた
    slot_filled: Condvar,
    /// 値が受信側に消費された
    taken: Condvar,
}

impl<T> RendezvousChannel<T> {
    /// チャネルを作成する
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                slot: None,
                deposits: 0,
                takes: 0,
            }),
            slot_free: Condvar::new(),
            slot_filled: Condvar::new(),
            taken: Condvar::new(),
        }
    }

    /// 値を送信し、受信側がそれを消費するまでブロックする
    pub fn send(&self, value: T) {
        let mut state = self.state.lock();

        // 先行する転送が完了するまでスロットを奪わない
        while state.slot.is_some() {
            self.slot_free.wait(&mut state);
        }

        state.slot = Some(value);
        state.deposits += 1;
        let ticket = state.deposits;
        self.slot_filled.notify_one();

        // 自分の置いた値が消費されるまで待つ
        while state.takes < ticket {
            self.taken.wait(&mut state);
        }
    }

    /// 値を受信する。送信側が現れるまでブロックする
    pub fn receive(&self) -> T {
        let mut state = self.state.lock();

        loop {
            if let Some(value) = state.slot.take() {
                state.takes += 1;
                self.slot_free.notify_one();
                self.taken.notify_all();
                return value;
            }
            self.slot_filled.wait(&mut state);
        }
    }
}

impl<T> Default for RendezvousChannel<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_transfers_a_value() {
        let channel = Arc::new(RendezvousChannel::new());
        let sender = channel.clone();

        let handle = thread::spawn(move || {
            sender.send(42);
        });

        assert_eq!(channel.receive(), 42);
        handle.join().unwrap();
    }

    #[test]
    fn test_send_blocks_until_receive() {
        let channel = Arc::new(RendezvousChannel::new());
        let sender = channel.clone();
        let (done_tx, done_rx) = mpsc::channel();

        thread::spawn(move || {
            sender.send(1);
            done_tx.send(()).unwrap();
        });

        // 受信側が現れるまで送信は完了しない
        assert!(done_rx.recv_timeout(Duration::from_millis(200)).is_err());

        assert_eq!(channel.receive(), 1);
        done_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("send should complete after receive");
    }

    #[test]
    fn test_concurrent_senders_are_serialized() {
        let channel = Arc::new(RendezvousChannel::new());
        let mut handles = Vec::new();

        for value in 0..4 {
            let sender = channel.clone();
            handles.push(thread::spawn(move || {
                sender.send(value);
            }));
        }

        let mut received = Vec::new();
        for _ in 0..4 {
            received.push(channel.receive());
        }

        for handle in handles {
            handle.join().unwrap();
        }

        received.sort_unstable();
        assert_eq!(received, vec![0, 1, 2, 3]);
    }
}
