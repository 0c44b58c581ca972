#![cfg_attr(nightly, feature(test))]

#[cfg(nightly)]
mod bench {
    extern crate test;

    use prodcon::bench::{pop_queue, push_queue, BOUNDED_SLOTS};
    use prodcon::{bounded, unbounded, Policy, SpscQueue, Token};
    use test::Bencher;

    const TOTAL_WORK: usize = 1_000_000;

    fn pair<Q: SpscQueue<Token> + Default>(b: &mut Bencher, policy: Policy) {
        b.iter(|| {
            let q = Q::default();
            let received = crossbeam::scope(|s| {
                s.spawn(|_| push_queue(&q, TOTAL_WORK, policy));
                s.spawn(|_| pop_queue(&q, policy)).join().unwrap()
            })
            .unwrap();
            assert_eq!(received, TOTAL_WORK);
        });
    }

    const NO_WORK: Policy = Policy {
        backoff: false,
        work: false,
        spin: 30,
    };

    const WORK: Policy = Policy {
        backoff: false,
        work: true,
        spin: 30,
    };

    #[bench]
    fn unbounded_1p1c(b: &mut Bencher) {
        pair::<unbounded::Queue<Token>>(b, NO_WORK);
    }

    #[bench]
    fn bounded_1p1c(b: &mut Bencher) {
        pair::<bounded::Queue<Token, BOUNDED_SLOTS>>(b, NO_WORK);
    }

    #[bench]
    fn unbounded_1p1c_work(b: &mut Bencher) {
        pair::<unbounded::Queue<Token>>(b, WORK);
    }

    #[bench]
    fn bounded_1p1c_work(b: &mut Bencher) {
        pair::<bounded::Queue<Token, BOUNDED_SLOTS>>(b, WORK);
    }
}
